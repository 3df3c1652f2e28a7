pub mod audios;
pub mod config;
pub mod ui;
pub mod upload;

pub use audios::*;
pub use config::*;
pub use ui::*;
pub use upload::*;

use crate::error::AppError;
use crate::health;
use actix_web::web;

/// Malformed query strings get the same JSON error body as every other
/// client mistake.
fn query_config() -> web::QueryConfig {
    web::QueryConfig::default()
        .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into())
}

/// Every route the server exposes.
///
/// The upload endpoint stays mounted at `/upload-audio` for existing clients
/// and is mirrored under `/api/v1` with the rest of the API.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .app_data(query_config())
            .route("/health", web::get().to(health::health_check))
            .route("/metrics", web::get().to(health::detailed_metrics))
            .route("/config", web::get().to(get_config))
            .route("/config", web::put().to(update_config))
            .route("/upload-audio", web::post().to(upload_audio))
            .route("/audios", web::get().to(list_audios))
            .route("/audios/{id}", web::get().to(get_audio)),
    )
    .route("/health", web::get().to(health::health_check))
    .route("/upload-audio", web::post().to(upload_audio))
    .route("/static/app.js", web::get().to(serve_app_js))
    .route("/", web::get().to(serve_index));
}
