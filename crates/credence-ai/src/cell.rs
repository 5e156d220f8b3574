//! Load-once holder for the inference engine.
//!
//! The loader closure runs at most once per cell, even under concurrent
//! access. Its outcome is cached either way: a failed load is reported on
//! every later request without retrying, so a broken model directory cannot
//! be hammered by repeated clicks.

use std::sync::{Arc, OnceLock};

use tracing::{error, info};

use crate::error::EngineError;

type Loader<E> = Box<dyn Fn() -> anyhow::Result<Arc<E>> + Send + Sync>;

pub struct EngineCell<E: ?Sized> {
    loader: Loader<E>,
    slot: OnceLock<Result<Arc<E>, String>>,
}

impl<E: ?Sized> EngineCell<E> {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<Arc<E>> + Send + Sync + 'static,
    {
        Self {
            loader: Box::new(loader),
            slot: OnceLock::new(),
        }
    }

    /// The engine, loading it on first use.
    pub fn get(&self) -> Result<Arc<E>, EngineError> {
        let slot = self.slot.get_or_init(|| match (self.loader)() {
            Ok(engine) => {
                info!("inference engine ready");
                Ok(engine)
            }
            Err(e) => {
                let message = format!("{e:#}");
                error!(error = %message, "inference engine failed to initialise");
                Err(message)
            }
        });
        match slot {
            Ok(engine) => Ok(Arc::clone(engine)),
            Err(message) => Err(EngineError::Unavailable(message.clone())),
        }
    }

    /// Whether a load has been attempted (successful or not).
    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }
}
