//! One analysis round-trip: normalise → classify → explain → highlight.

use std::time::{Duration, Instant};

use credence_core::{Label, Prediction, TokenAttribution, clean_optional, render_attributions};
use tracing::{Level, debug, info};

use crate::device::Device;

/// The model operations an analysis needs.
///
/// Implemented by the ONNX `InferenceEngine` (feature `onnx`); tests
/// substitute stubs.
pub trait Analyzer: Send + Sync {
    fn device(&self) -> Device;

    /// Token cap applied to model inputs.
    fn max_length(&self) -> usize;

    /// Classify normalised text.
    fn predict(&self, text: &str) -> anyhow::Result<Prediction>;

    /// Per-token attribution toward `target`, markers included.
    fn explain(&self, text: &str, target: Label) -> anyhow::Result<Vec<TokenAttribution>>;

    /// Number of tokens in the untruncated encoding, markers included.
    fn token_count(&self, text: &str) -> anyhow::Result<usize>;
}

/// Everything the result page shows for one article.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub normalized: String,
    pub prediction: Prediction,
    pub attributions: Vec<TokenAttribution>,
    /// Attribution markup from [`render_attributions`].
    pub highlighted: String,
    pub token_count: usize,
    /// The article was longer than the model accepts and was cut.
    pub truncated: bool,
    pub device: Device,
    /// Wall-clock time of classification plus attribution.
    pub elapsed: Duration,
}

impl Analysis {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Run the full pipeline on raw user input.
///
/// The explained class is always the predicted one.
pub fn analyze<A: Analyzer + ?Sized>(analyzer: &A, raw: Option<&str>) -> anyhow::Result<Analysis> {
    let normalized = clean_optional(raw);

    let start = Instant::now();
    let prediction = analyzer.predict(&normalized)?;
    let attributions = analyzer.explain(&normalized, prediction.label)?;
    let elapsed = start.elapsed();

    let highlighted = render_attributions(&attributions, prediction.label);
    let token_count = analyzer.token_count(&normalized)?;
    let truncated = token_count > analyzer.max_length();

    info!(
        label = %prediction.label,
        confidence = prediction.confidence,
        tokens = token_count,
        truncated,
        elapsed_ms = elapsed.as_secs_f64() * 1000.0,
        "analysed article"
    );
    if tracing::enabled!(Level::DEBUG) {
        let prediction_json = serde_json::to_string(&prediction)?;
        let attributions_json = serde_json::to_string(&attributions)?;
        debug!(
            prediction = %prediction_json,
            attributions = %attributions_json,
            "analysis detail"
        );
    }

    Ok(Analysis {
        normalized,
        prediction,
        attributions,
        highlighted,
        token_count,
        truncated,
        device: analyzer.device(),
        elapsed,
    })
}
