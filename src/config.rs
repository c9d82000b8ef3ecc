use std::path::PathBuf;
use std::time::Duration;
use clap::Parser;

use crate::pipeline::{
    PipelineSettings, DEFAULT_API_NAME, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_PREDICT_TIMEOUT,
};
use crate::predictor::gradio::{space_url, GradioSettings};

/// Relay service settings, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(name = "accent_relay_service", version, about = "Relays audio uploads to a hosted accent model")]
pub struct Config {
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Number of HTTP worker threads (defaults to the number of CPUs)
    #[arg(long, env = "RELAY_WORKERS")]
    pub workers: Option<usize>,

    /// Web origins allowed to call `/api/*`, comma separated; `*` allows any
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "https://accento-prototype.netlify.app"
    )]
    pub allowed_origins: Vec<String>,

    /// Hugging Face space id hosting the model
    #[arg(long, env = "GRADIO_SPACE", default_value = "Gitanjaliyadav29/accento-ml-model")]
    pub space: String,

    /// Explicit base URL of the space, overrides the one derived from `--space`
    #[arg(long, env = "GRADIO_SPACE_URL")]
    pub space_url: Option<String>,

    #[arg(long, env = "GRADIO_API_PREFIX", default_value = "/gradio_api")]
    pub api_prefix: String,

    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    #[arg(long, env = "PREDICT_API_NAME", default_value = DEFAULT_API_NAME)]
    pub api_name: String,

    #[arg(long, env = "PREDICT_TIMEOUT_SECS", default_value_t = DEFAULT_PREDICT_TIMEOUT.as_secs())]
    pub predict_timeout_secs: u64,

    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: u64,

    /// Where uploads are parked while the model runs (defaults to the OS temp dir)
    #[arg(long, env = "RELAY_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,
}

impl Config {
    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }

    pub fn gradio_settings(&self) -> GradioSettings {
        GradioSettings {
            base_url: self.space_url.clone().unwrap_or_else(|| space_url(&self.space)),
            api_prefix: self.api_prefix.clone(),
            token: self.hf_token.clone().filter(|t| !t.is_empty()),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            temp_dir: self.temp_dir.clone().unwrap_or_else(std::env::temp_dir),
            api_name: self.api_name.clone(),
            predict_timeout: Duration::from_secs(self.predict_timeout_secs),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}
