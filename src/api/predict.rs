use actix_multipart::{Field, Multipart};
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use futures::TryStreamExt;
use log::{debug, info};

use crate::api::{cors_policy, IndexResponse, PredictionResponse};
use crate::errors::{RelayError, RelayResult};
use crate::pipeline::PredictionPipeline;

/// Multipart field carrying the uploaded recording.
pub const AUDIO_FIELD: &str = "audio";

pub fn config(cfg: &mut web::ServiceConfig, allowed_origins: &[String]) {
    cfg.route("/", web::get().to(index)).service(
        web::scope("/api")
            .wrap(cors_policy(allowed_origins))
            .route("/predict", web::post().to(predict_accent)),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Ok().json(IndexResponse {
        message: "Accent relay API is live!".to_string(),
        status: "OK".to_string(),
    })
}

async fn predict_accent(
    req: HttpRequest,
    mut payload: Multipart,
    pipeline: web::Data<PredictionPipeline>,
) -> Result<HttpResponse, RelayError> {
    if !is_multipart(&req) {
        return Err(RelayError::MissingAudio);
    }

    let mut staged = None;
    while let Some(field) = payload.try_next().await.map_err(malformed)? {
        match audio_filename(&field) {
            Some(filename) => {
                info!("Received audio upload {:?}", filename);
                let extension = pipeline.accept(&filename)?;
                staged = Some(pipeline.stage(extension, field).await?);
                break;
            }
            None => drain(field).await?,
        }
    }

    let audio = staged.ok_or(RelayError::MissingAudio)?;
    let prediction = pipeline.predict(audio).await?;

    Ok(HttpResponse::Ok().json(PredictionResponse { prediction }))
}

fn is_multipart(req: &HttpRequest) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map_or(false, |value| value.trim_start().to_ascii_lowercase().starts_with("multipart/"))
}

/// Filename of the field if it is the audio file part. A part named `audio`
/// without a filename is a plain form value, not an upload.
fn audio_filename(field: &Field) -> Option<String> {
    let disposition = field.content_disposition()?;
    if disposition.get_name() != Some(AUDIO_FIELD) {
        return None;
    }
    disposition.get_filename().map(str::to_string)
}

async fn drain(mut field: Field) -> RelayResult<()> {
    debug!("Skipping multipart field {:?}", field.name());
    while field.try_next().await.map_err(malformed)?.is_some() {}
    Ok(())
}

fn malformed(err: actix_multipart::MultipartError) -> RelayError {
    RelayError::MalformedUpload(err.to_string())
}
