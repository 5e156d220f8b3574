use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// The model could not be loaded at startup; the message is cached for
    /// every later request.
    #[error("model initialisation failed: {0}")]
    Unavailable(String),
}
