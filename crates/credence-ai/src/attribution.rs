//! Token attribution by occlusion.
//!
//! For each content token, the token id is replaced by a neutral baseline id
//! (`[PAD]`) and the model is re-run. The drop in the target class
//! probability is that token's raw score: positive when the token supports the
//! target, negative when it argues against it. Boundary markers keep their
//! ids in every variant and therefore score zero.
//!
//! Raw scores are divided by their L2 norm, so only relative magnitudes carry
//! meaning.

use credence_core::{ClassProbabilities, Label, TokenAttribution};
use tracing::debug;

/// A tokenized input ready to be fed to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedText {
    pub ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub type_ids: Vec<i64>,
    pub tokens: Vec<String>,
    /// `true` for tokenizer-inserted markers such as `[CLS]` and `[SEP]`.
    pub special: Vec<bool>,
}

impl EncodedText {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Copy of this input with the token at `position` replaced by `baseline_id`.
    pub fn occlude(&self, position: usize, baseline_id: i64) -> Self {
        let mut variant = self.clone();
        variant.ids[position] = baseline_id;
        variant
    }

    /// Positions that carry real text (not markers, not padding).
    fn content_positions(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| !self.special[i] && self.attention_mask[i] != 0)
            .collect()
    }
}

#[cfg(feature = "onnx")]
impl From<&tokenizers::Encoding> for EncodedText {
    fn from(encoding: &tokenizers::Encoding) -> Self {
        Self {
            ids: encoding.get_ids().iter().map(|&id| id as i64).collect(),
            attention_mask: encoding
                .get_attention_mask()
                .iter()
                .map(|&m| m as i64)
                .collect(),
            type_ids: encoding.get_type_ids().iter().map(|&t| t as i64).collect(),
            tokens: encoding.get_tokens().to_vec(),
            special: encoding
                .get_special_tokens_mask()
                .iter()
                .map(|&s| s != 0)
                .collect(),
        }
    }
}

/// Anything that can score a batch of encoded inputs.
pub trait ProbabilityModel {
    /// Class probabilities, one entry per input, in input order.
    fn probabilities(&self, batch: &[EncodedText]) -> anyhow::Result<Vec<ClassProbabilities>>;
}

/// Occlusion-based explainer.
#[derive(Debug, Clone, Copy)]
pub struct OcclusionExplainer {
    /// Token id substituted for the occluded token.
    pub baseline_id: i64,
    /// Number of occluded variants scored per forward pass.
    pub batch_size: usize,
}

impl OcclusionExplainer {
    pub fn new(baseline_id: i64, batch_size: usize) -> Self {
        Self {
            baseline_id,
            batch_size: batch_size.max(1),
        }
    }

    /// Attribute the `target` class probability to each token of `input`.
    ///
    /// Returns one entry per token position, markers included.
    pub fn explain<M: ProbabilityModel + ?Sized>(
        &self,
        model: &M,
        input: &EncodedText,
        target: Label,
    ) -> anyhow::Result<Vec<TokenAttribution>> {
        let mut scores = vec![0.0f32; input.len()];
        let positions = input.content_positions();

        if !positions.is_empty() {
            let reference = model
                .probabilities(std::slice::from_ref(input))?
                .first()
                .map(|p| p.of(target))
                .ok_or_else(|| anyhow::anyhow!("model returned no output for reference input"))?;

            for chunk in positions.chunks(self.batch_size.max(1)) {
                let variants: Vec<EncodedText> = chunk
                    .iter()
                    .map(|&i| input.occlude(i, self.baseline_id))
                    .collect();
                let probs = model.probabilities(&variants)?;
                anyhow::ensure!(
                    probs.len() == variants.len(),
                    "model returned {} outputs for {} occluded inputs",
                    probs.len(),
                    variants.len()
                );
                for (&i, p) in chunk.iter().zip(&probs) {
                    scores[i] = reference - p.of(target);
                }
            }
        }

        normalize(&mut scores);
        debug!(
            tokens = input.len(),
            occluded = positions.len(),
            target = %target,
            "computed occlusion attributions"
        );

        Ok(input
            .tokens
            .iter()
            .zip(scores)
            .map(|(token, score)| TokenAttribution::new(token.clone(), score))
            .collect())
    }
}

/// L2-normalize a vector in place.
fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
