//! Gradio space adapter
//!
//! Talks to a hosted Gradio app over its HTTP API:
//! 1. Upload the audio file and receive a server-side path
//! 2. Queue a call to the named endpoint with that file
//! 3. Read the event stream until the call completes or fails

use std::path::Path;
use std::time::Duration;
use async_trait::async_trait;
use log::{debug, info};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::upload::AudioExtension;
use super::{PredictionError, Predictor};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const FALLBACK_MIME: &str = "application/octet-stream";
const NO_ERROR_DETAILS: &str = "the model reported an error without details";

#[derive(Debug, Clone)]
pub struct GradioSettings {
    /// Root URL of the space, e.g. `https://owner-name.hf.space`
    pub base_url: String,
    /// Path prefix of the Gradio HTTP API (`/gradio_api` on current releases)
    pub api_prefix: String,
    /// Bearer token for private spaces
    pub token: Option<String>,
}

pub struct GradioClient {
    client: Client,
    base_url: String,
    api_prefix: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueuedCall {
    event_id: String,
}

impl GradioClient {
    pub fn new(settings: GradioSettings) -> Result<Self, PredictionError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_prefix: normalize_path(&settings.api_prefix),
            token: settings.token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.api_prefix, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Upload the audio file and return the path the space stored it under.
    async fn upload_file(&self, audio_path: &Path) -> Result<(String, String), PredictionError> {
        let bytes = tokio::fs::read(audio_path)
            .await
            .map_err(|e| PredictionError::Input(format!("{}: {}", audio_path.display(), e)))?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();
        let mime = AudioExtension::from_filename(&file_name)
            .map(AudioExtension::mime_type)
            .unwrap_or(FALLBACK_MIME);

        debug!("Uploading {} ({} bytes) to {}", file_name, bytes.len(), self.base_url);

        let part = Part::bytes(bytes).file_name(file_name.clone()).mime_str(mime)?;
        let response = self
            .authorized(self.client.post(self.url("/upload")))
            .multipart(Form::new().part("files", part))
            .send()
            .await?;

        let paths: Vec<String> = ensure_success(response).await?.json().await?;
        let server_path = paths
            .into_iter()
            .next()
            .ok_or_else(|| PredictionError::MalformedResponse("upload returned no file path".to_string()))?;

        Ok((server_path, file_name))
    }

    async fn queue_call(&self, api_name: &str, server_path: &str, file_name: &str) -> Result<String, PredictionError> {
        let body = json!({
            "data": [{
                "path": server_path,
                "orig_name": file_name,
                "meta": {"_type": "gradio.FileData"}
            }]
        });

        let response = self
            .authorized(self.client.post(self.url(&format!("/call{}", api_name))))
            .json(&body)
            .send()
            .await?;

        let queued: QueuedCall = ensure_success(response).await?.json().await?;
        Ok(queued.event_id)
    }

    async fn await_result(&self, api_name: &str, event_id: &str) -> Result<Value, PredictionError> {
        let response = self
            .authorized(self.client.get(self.url(&format!("/call{}/{}", api_name, event_id))))
            .send()
            .await?;

        let stream = ensure_success(response).await?.text().await?;
        parse_event_stream(&stream)
    }
}

#[async_trait]
impl Predictor for GradioClient {
    async fn predict(&self, audio_path: &Path, api_name: &str) -> Result<Value, PredictionError> {
        let api_name = normalize_path(api_name);
        let (server_path, file_name) = self.upload_file(audio_path).await?;
        let event_id = self.queue_call(&api_name, &server_path, &file_name).await?;
        info!("Queued {} call {} for {}", api_name, event_id, file_name);
        self.await_result(&api_name, &event_id).await
    }
}

async fn ensure_success(response: Response) -> Result<Response, PredictionError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PredictionError::Status { status: status.as_u16(), body })
}

/// Extract the outcome of a queued call from its server-sent event stream.
///
/// A single output is unwrapped; endpoints with several outputs yield the
/// whole list.
pub(crate) fn parse_event_stream(stream: &str) -> Result<Value, PredictionError> {
    let mut event: Option<&str> = None;

    for line in stream.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = Some(name.trim());
        } else if let Some(data) = line.strip_prefix("data:") {
            match event {
                Some("complete") => {
                    let outputs: Value = serde_json::from_str(data.trim())
                        .map_err(|e| PredictionError::MalformedResponse(e.to_string()))?;
                    return Ok(match outputs {
                        Value::Array(mut items) if items.len() == 1 => items.remove(0),
                        other => other,
                    });
                }
                Some("error") => {
                    let data = data.trim();
                    let message = match serde_json::from_str::<Value>(data) {
                        Ok(Value::String(message)) => message,
                        Ok(Value::Null) => NO_ERROR_DETAILS.to_string(),
                        Ok(other) => other.to_string(),
                        Err(_) if data.is_empty() => NO_ERROR_DETAILS.to_string(),
                        Err(_) => data.to_string(),
                    };
                    return Err(PredictionError::Remote(message));
                }
                _ => {}
            }
        }
    }

    Err(PredictionError::MalformedResponse("event stream ended without a result".to_string()))
}

/// Hugging Face host for a space id such as `Owner/Some_Space`.
pub fn space_url(space: &str) -> String {
    let space = space.trim();
    if space.starts_with("http://") || space.starts_with("https://") {
        return space.trim_end_matches('/').to_string();
    }
    let host: String = space
        .chars()
        .map(|c| match c {
            '/' | '_' | '.' => '-',
            c => c.to_ascii_lowercase(),
        })
        .collect();
    format!("https://{}.hf.space", host)
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
