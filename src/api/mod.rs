use actix_cors::Cors;
use actix_web::http::{header, Method};
use serde::Serialize;
use serde_json::Value;

pub mod predict;

pub use predict::config;

const CORS_MAX_AGE_SECS: usize = 3600;

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub prediction: Value,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub message: String,
    pub status: String,
}

/// Cross-origin policy for the `/api` scope. `*` admits any origin.
pub fn cors_policy(allowed_origins: &[String]) -> Cors {
    let mut cors = Cors::default()
        .allowed_methods(vec![Method::GET, Method::POST])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .max_age(CORS_MAX_AGE_SECS);

    for origin in allowed_origins {
        let origin = origin.trim().trim_end_matches('/');
        if origin == "*" {
            cors = cors.allow_any_origin();
        } else if !origin.is_empty() {
            cors = cors.allowed_origin(origin);
        }
    }

    cors
}
