use std::path::Path;
use async_trait::async_trait;
use serde_json::Value;

pub use crate::errors::PredictionError;

pub mod gradio;

/// The hosted model that turns an audio file into a prediction.
///
/// The returned value is opaque to the relay and is handed back to the
/// caller untouched.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, audio_path: &Path, api_name: &str) -> Result<Value, PredictionError>;
}
