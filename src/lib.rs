pub mod api;
pub mod config;
pub mod errors;
pub mod pipeline;
pub mod predictor;
pub mod upload;
