//! Inference layer: ONNX Runtime credibility classification, token attribution, analysis pipeline.

pub mod attribution;
mod cell;
mod device;
mod error;
pub mod pipeline;

pub use attribution::{EncodedText, OcclusionExplainer, ProbabilityModel};
pub use cell::EngineCell;
pub use device::Device;
pub use error::EngineError;
pub use pipeline::{Analysis, Analyzer, analyze};

#[cfg(feature = "onnx")]
mod engine;
#[cfg(feature = "onnx")]
pub use engine::{EngineOptions, InferenceEngine, MAX_LENGTH};
