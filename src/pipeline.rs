use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use actix_web::web::Bytes;
use futures::{Stream, StreamExt};
use log::{debug, error, info};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use crate::errors::{PredictionError, RelayError, RelayResult};
use crate::predictor::Predictor;
use crate::upload::{AudioExtension, TempAudioFile};

pub const DEFAULT_API_NAME: &str = "/predict";
pub const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory that holds uploads while the model runs
    pub temp_dir: PathBuf,
    /// Endpoint name passed to the prediction service
    pub api_name: String,
    /// Upper bound on a single prediction call
    pub predict_timeout: Duration,
    /// Largest upload accepted before answering 413
    pub max_upload_bytes: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir(),
            api_name: DEFAULT_API_NAME.to_string(),
            predict_timeout: DEFAULT_PREDICT_TIMEOUT,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Validates an uploaded audio file, parks it on disk and hands it to the
/// prediction service. The file is removed on every exit path.
pub struct PredictionPipeline {
    predictor: Arc<dyn Predictor>,
    settings: PipelineSettings,
}

impl PredictionPipeline {
    pub fn new(predictor: Arc<dyn Predictor>, settings: PipelineSettings) -> Self {
        Self { predictor, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Check the declared filename before anything touches the disk.
    pub fn accept(&self, filename: &str) -> RelayResult<AudioExtension> {
        AudioExtension::from_filename(filename).ok_or_else(|| {
            debug!("Rejected upload with filename {:?}", filename);
            RelayError::InvalidFileType
        })
    }

    /// Stream the upload into a fresh temporary file.
    pub async fn stage<S, E>(&self, extension: AudioExtension, chunks: S) -> RelayResult<TempAudioFile>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let (audio, mut file) = TempAudioFile::create(&self.settings.temp_dir, extension).await?;
        let copied = self.copy_chunks(&mut file, chunks).await;
        drop(file);

        let written = copied?;
        debug!("Stored {} bytes at {}", written, audio.path().display());
        Ok(audio)
    }

    async fn copy_chunks<S, E>(&self, file: &mut File, mut chunks: S) -> RelayResult<u64>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: fmt::Display,
    {
        let limit = self.settings.max_upload_bytes;
        let mut written: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let data = chunk.map_err(|e| RelayError::MalformedUpload(e.to_string()))?;
            written += data.len() as u64;
            if written > limit {
                return Err(RelayError::UploadTooLarge { limit });
            }
            file.write_all(&data).await?;
        }
        file.flush().await?;

        Ok(written)
    }

    /// Run the prediction service on a staged file and remove the file afterwards.
    pub async fn predict(&self, mut audio: TempAudioFile) -> RelayResult<Value> {
        let limit = self.settings.predict_timeout;
        let call = self.predictor.predict(audio.path(), &self.settings.api_name);

        let outcome = match timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(PredictionError::Timeout(limit)),
        };
        audio.cleanup();

        match outcome {
            Ok(prediction) => {
                info!("Prediction completed for {}", audio.path().display());
                Ok(prediction)
            }
            Err(e) => {
                error!("Prediction error: {}", e);
                Err(RelayError::Prediction(e))
            }
        }
    }
}
