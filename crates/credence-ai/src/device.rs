//! Compute device selection for ONNX Runtime.

use std::fmt;

use tracing::info;

/// Where the classification model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Cpu,
    /// NVIDIA GPU through the ONNX Runtime CUDA execution provider.
    Cuda,
}

impl Device {
    /// Prefer CUDA when compiled in and usable, otherwise CPU.
    ///
    /// Called once while loading the engine; the result is fixed for the
    /// lifetime of the process.
    pub fn select() -> Self {
        let device = if cuda_available() {
            Self::Cuda
        } else {
            Self::Cpu
        };
        info!(device = %device, "selected compute device");
        device
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cpu => "CPU",
            Self::Cuda => "CUDA",
        }
    }

    /// Session builder with this device's execution provider registered.
    #[cfg(feature = "onnx")]
    pub fn session_builder(self) -> anyhow::Result<ort::session::builder::SessionBuilder> {
        let builder = ort::session::Session::builder()?;
        match self {
            Self::Cpu => Ok(builder),
            #[cfg(feature = "cuda")]
            Self::Cuda => {
                use ort::execution_providers::CUDAExecutionProvider;
                builder
                    .with_execution_providers([CUDAExecutionProvider::default().build()])
                    .map_err(|e| anyhow::anyhow!("register CUDA execution provider: {e}"))
            }
            #[cfg(not(feature = "cuda"))]
            Self::Cuda => anyhow::bail!("built without CUDA support"),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "cuda")]
fn cuda_available() -> bool {
    use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};

    match CUDAExecutionProvider::default().is_available() {
        Ok(available) => available,
        Err(e) => {
            tracing::warn!(error = %e, "could not query CUDA execution provider");
            false
        }
    }
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> bool {
    false
}
