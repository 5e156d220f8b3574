//! Class labels and per-request prediction types.
//!
//! The classifier is binary: index 0 is a credible article (REAL), index 1 a
//! fabricated one (FAKE). Everything here is recomputed per request and never
//! stored.

use std::fmt;

use serde::Serialize;

/// Output class of the credibility model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    Real = 0,
    Fake = 1,
}

impl Label {
    /// Model output index for this class.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The opposing class.
    pub fn other(self) -> Self {
        match self {
            Self::Real => Self::Fake,
            Self::Fake => Self::Real,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Fake => "FAKE",
        }
    }

    /// Human-readable verdict shown on the result banner.
    pub fn verdict(&self) -> &'static str {
        match self {
            Self::Real => "CREDIBLE (REAL)",
            Self::Fake => "FABRICATED (FAKE)",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Softmax output over the two classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub real: f32,
    pub fake: f32,
}

impl ClassProbabilities {
    /// Softmax over one row of model logits, read at each label's index.
    pub fn from_logit_row(row: &[f32]) -> Option<Self> {
        let real = *row.get(Label::Real.index())?;
        let fake = *row.get(Label::Fake.index())?;
        Some(Self::from_logits(real, fake))
    }

    /// Numerically stable softmax over `[real_logit, fake_logit]`.
    pub fn from_logits(real_logit: f32, fake_logit: f32) -> Self {
        let max = real_logit.max(fake_logit);
        let real = (real_logit - max).exp();
        let fake = (fake_logit - max).exp();
        let sum = real + fake;
        Self {
            real: real / sum,
            fake: fake / sum,
        }
    }

    /// Probability mass assigned to `label`.
    pub fn of(&self, label: Label) -> f32 {
        match label {
            Label::Real => self.real,
            Label::Fake => self.fake,
        }
    }

    /// Argmax; ties go to the lower index (REAL).
    pub fn argmax(&self) -> Label {
        if self.fake > self.real {
            Label::Fake
        } else {
            Label::Real
        }
    }
}

/// Classification of a single article.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prediction {
    pub label: Label,
    /// Probability of `label`.
    pub confidence: f32,
    pub prob_real: f32,
    pub prob_fake: f32,
}

impl Prediction {
    pub fn from_probabilities(probs: ClassProbabilities) -> Self {
        let label = probs.argmax();
        Self {
            label,
            confidence: probs.of(label),
            prob_real: probs.real,
            prob_fake: probs.fake,
        }
    }
}

/// One sub-word token with its signed importance for the explained class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TokenAttribution {
    pub token: String,
    pub score: f32,
}

impl TokenAttribution {
    pub fn new(token: impl Into<String>, score: f32) -> Self {
        Self {
            token: token.into(),
            score,
        }
    }
}
