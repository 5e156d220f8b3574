//! Inline HTML rendering of token attributions.
//!
//! Each token becomes a `<span>` whose background encodes which class it
//! pushes the model toward: red for FAKE, green for REAL, with opacity
//! proportional to the score magnitude. The colour depends only on the push
//! direction, so the same token reads the same whichever class was predicted.

use std::fmt::Write;

use crate::label::{Label, TokenAttribution};

/// Sequence boundary markers inserted by the WordPiece tokenizer.
pub const SPECIAL_TOKENS: [&str; 2] = ["[CLS]", "[SEP]"];

/// Prefix marking a WordPiece continuation of the previous word.
pub const CONTINUATION_PREFIX: &str = "##";

/// Opacity gain applied to `|score|`. Chosen by eye for contrast; tune freely.
pub const OPACITY_GAIN: f32 = 5.0;

/// Scores with magnitude below this render as plain text.
pub const NEGLIGIBLE_SCORE: f32 = 0.05;

const HIGHLIGHT_STYLE: &str = "border-radius: 3px; padding: 0 2px;";

/// Background highlight for one token.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Highlight {
    /// Class the token pushes the prediction toward.
    pub toward: Label,
    /// Background alpha in `[0, 1]`.
    pub opacity: f32,
}

impl Highlight {
    /// CSS `rgba(...)` colour: red toward FAKE, green toward REAL.
    pub fn css_color(&self) -> String {
        let (r, g) = match self.toward {
            Label::Fake => (255, 0),
            Label::Real => (0, 255),
        };
        format!("rgba({r}, {g}, 0, {:.3})", self.opacity)
    }
}

/// Background opacity for a score: `min(|score| * OPACITY_GAIN, 1)`.
pub fn opacity(score: f32) -> f32 {
    (score.abs() * OPACITY_GAIN).min(1.0)
}

/// Map a score for the `predicted` class to a highlight.
///
/// A positive score pushes toward `predicted`, a negative one toward the
/// other class. Returns `None` for negligible scores (and NaN).
pub fn push_color(predicted: Label, score: f32) -> Option<Highlight> {
    if score.is_nan() || score.abs() < NEGLIGIBLE_SCORE {
        return None;
    }
    let toward = if score > 0.0 {
        predicted
    } else {
        predicted.other()
    };
    Some(Highlight {
        toward,
        opacity: opacity(score),
    })
}

/// Text shown for a token: continuation prefix removed.
pub fn display_token(token: &str) -> &str {
    token.strip_prefix(CONTINUATION_PREFIX).unwrap_or(token)
}

pub fn is_special(token: &str) -> bool {
    SPECIAL_TOKENS.contains(&token)
}

/// Render attributions for the `predicted` class as one HTML block.
///
/// Boundary markers are skipped; every other token is followed by a space.
pub fn render_attributions(attributions: &[TokenAttribution], predicted: Label) -> String {
    let mut html = String::from(r#"<div class="highlight-text">"#);

    for attr in attributions.iter().filter(|a| !is_special(&a.token)) {
        let word = escape_html(display_token(&attr.token));
        // Writing into a String cannot fail.
        let _ = match push_color(predicted, attr.score) {
            None => write!(html, "<span>{word} </span>"),
            Some(hl) => write!(
                html,
                r#"<span style="background-color: {}; {HIGHLIGHT_STYLE}">{word}</span> "#,
                hl.css_color()
            ),
        };
    }

    html.push_str("</div>");
    html
}

/// Escape text for safe inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
