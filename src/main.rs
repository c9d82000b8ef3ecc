use std::io;
use std::sync::Arc;
use actix_web::{middleware, web, App, HttpServer};
use clap::Parser;
use log::info;

use accent_relay_service::api;
use accent_relay_service::config::Config;
use accent_relay_service::pipeline::PredictionPipeline;
use accent_relay_service::predictor::gradio::GradioClient;

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::parse();
    let gradio = config.gradio_settings();
    info!("Relaying predictions to {} ({})", gradio.base_url, config.api_name);

    let predictor = GradioClient::new(gradio).map_err(io::Error::other)?;
    let pipeline = web::Data::new(PredictionPipeline::new(
        Arc::new(predictor),
        config.pipeline_settings(),
    ));
    info!("Temporary uploads go to {}", pipeline.settings().temp_dir.display());

    let allowed_origins = config.allowed_origins.clone();
    info!("Allowed origins for /api: {:?}", allowed_origins);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(pipeline.clone())
            .wrap(middleware::Logger::default())
            .configure(|cfg| api::config(cfg, &allowed_origins))
    });
    if let Some(workers) = config.workers {
        server = server.workers(workers);
    }

    let (host, port) = config.bind_address();
    info!("Listening on {}:{}", host, port);
    server.bind((host, port))?.run().await
}
