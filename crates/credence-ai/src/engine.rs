//! ONNX Runtime sequence classifier for article credibility.
//!
//! Wraps a BERT-style binary classifier exported to ONNX (logits output of
//! shape `[batch, 2]`, index 0 = REAL, index 1 = FAKE). The model directory
//! must contain `model.onnx` and `tokenizer.json`.

use std::path::Path;
use std::sync::Mutex;

use credence_core::{ClassProbabilities, Label, Prediction, TokenAttribution};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::info;

use crate::attribution::{EncodedText, OcclusionExplainer, ProbabilityModel};
use crate::device::Device;
use crate::pipeline::Analyzer;

/// BERT positional limit.
pub const MAX_LENGTH: usize = 512;

/// Token used as the occlusion baseline.
const PAD_TOKEN: &str = "[PAD]";

/// Load-time settings for [`InferenceEngine`].
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Truncation length for model inputs.
    pub max_length: usize,
    /// Occluded variants scored per forward pass during attribution.
    pub attribution_batch: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            max_length: MAX_LENGTH,
            attribution_batch: 16,
        }
    }
}

/// Tokenizer, classifier session, device, and explainer bundled together.
///
/// Immutable after [`load`](Self::load). ONNX Runtime needs exclusive access
/// to the session while it runs, so analyses are serialised on its lock.
pub struct InferenceEngine {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    /// Same vocabulary without truncation, for reporting full article length.
    counter: Tokenizer,
    device: Device,
    explainer: OcclusionExplainer,
    pad_id: i64,
    max_length: usize,
}

impl InferenceEngine {
    /// Load a classifier from a directory containing `model.onnx` and `tokenizer.json`.
    pub fn load(model_dir: &Path, options: &EngineOptions) -> anyhow::Result<Self> {
        anyhow::ensure!(
            model_dir.is_dir(),
            "model directory not found: {}",
            model_dir.display()
        );

        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");

        anyhow::ensure!(model_path.exists(), "model.onnx not found in {model_dir:?}");
        anyhow::ensure!(
            tokenizer_path.exists(),
            "tokenizer.json not found in {model_dir:?}"
        );

        let device = Device::select();
        let session = device.session_builder()?.commit_from_file(&model_path)?;

        let mut counter = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("load tokenizer: {e}"))?;
        counter
            .with_truncation(None)
            .map_err(|e| anyhow::anyhow!("clear truncation: {e}"))?;
        counter.with_padding(None);

        let mut tokenizer = counter.clone();
        tokenizer
            .with_truncation(Some(tokenizers::TruncationParams {
                max_length: options.max_length,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("set truncation: {e}"))?;
        tokenizer.with_padding(Some(tokenizers::PaddingParams {
            ..Default::default()
        }));

        let pad_id = tokenizer
            .token_to_id(PAD_TOKEN)
            .ok_or_else(|| anyhow::anyhow!("{PAD_TOKEN} missing from tokenizer vocabulary"))?
            as i64;

        info!(
            device = %device,
            max_length = options.max_length,
            attribution_batch = options.attribution_batch,
            model = %model_path.display(),
            "loaded classification model"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            counter,
            device,
            explainer: OcclusionExplainer::new(pad_id, options.attribution_batch),
            pad_id,
            max_length: options.max_length,
        })
    }

    /// Tokenize with markers, truncated to the model limit.
    pub fn encode(&self, text: &str) -> anyhow::Result<EncodedText> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        Ok(EncodedText::from(&encoding))
    }
}

impl ProbabilityModel for InferenceEngine {
    fn probabilities(&self, batch: &[EncodedText]) -> anyhow::Result<Vec<ClassProbabilities>> {
        if batch.is_empty() {
            return Ok(vec![]);
        }

        let batch_size = batch.len();
        let seq_len = batch.iter().map(EncodedText::len).max().unwrap_or(0);

        // Build flat input tensors: [batch_size, seq_len], right-padded.
        let mut input_ids = vec![self.pad_id; batch_size * seq_len];
        let mut attention_mask = vec![0i64; batch_size * seq_len];
        let mut token_type_ids = vec![0i64; batch_size * seq_len];

        for (i, encoded) in batch.iter().enumerate() {
            let offset = i * seq_len;
            let n = encoded.len();
            input_ids[offset..offset + n].copy_from_slice(&encoded.ids);
            attention_mask[offset..offset + n].copy_from_slice(&encoded.attention_mask);
            token_type_ids[offset..offset + n].copy_from_slice(&encoded.type_ids);
        }

        let shape = [batch_size as i64, seq_len as i64];

        let ids_tensor = Tensor::from_array((shape, input_ids.into_boxed_slice()))?;
        let mask_tensor = Tensor::from_array((shape, attention_mask.into_boxed_slice()))?;
        let type_tensor = Tensor::from_array((shape, token_type_ids.into_boxed_slice()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("inference session lock poisoned"))?;

        let outputs = session.run(ort::inputs![
            "input_ids" => ids_tensor,
            "attention_mask" => mask_tensor,
            "token_type_ids" => type_tensor,
        ])?;

        // Logits: [batch_size, 2].
        let (output_shape, logits) = outputs[0].try_extract_tensor::<f32>()?;
        let dims: &[i64] = output_shape;
        anyhow::ensure!(
            dims.len() == 2 && dims[0] as usize == batch_size && dims[1] == 2,
            "unexpected logits shape: {dims:?}, expected [{batch_size}, 2]"
        );

        logits
            .chunks_exact(2)
            .map(|row| {
                ClassProbabilities::from_logit_row(row)
                    .ok_or_else(|| anyhow::anyhow!("short logits row: {row:?}"))
            })
            .collect()
    }
}

impl Analyzer for InferenceEngine {
    fn device(&self) -> Device {
        self.device
    }

    fn max_length(&self) -> usize {
        self.max_length
    }

    fn predict(&self, text: &str) -> anyhow::Result<Prediction> {
        let encoded = self.encode(text)?;
        let probs = self
            .probabilities(std::slice::from_ref(&encoded))?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("model returned no logits"))?;
        Ok(Prediction::from_probabilities(probs))
    }

    fn explain(&self, text: &str, target: Label) -> anyhow::Result<Vec<TokenAttribution>> {
        let encoded = self.encode(text)?;
        self.explainer.explain(self, &encoded, target)
    }

    fn token_count(&self, text: &str) -> anyhow::Result<usize> {
        let encoding = self
            .counter
            .encode(text, true)
            .map_err(|e| anyhow::anyhow!("tokenize: {e}"))?;
        Ok(encoding.get_ids().len())
    }
}
