//! Health and metrics endpoints
//!
//! - `GET /health`, `GET /api/v1/health`: liveness plus dependency checks
//! - `GET /api/v1/metrics`: per-endpoint request statistics

use crate::db;
use crate::state::{AppMetrics, AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Overall status from the two dependencies an upload needs.
///
/// - database down → `unhealthy` (503): nothing can be recorded
/// - media host not configured → `degraded` (200): server is up, uploads fail
fn overall_status(database_ok: bool, media_configured: bool) -> &'static str {
    match (database_ok, media_configured) {
        (false, _) => "unhealthy",
        (true, false) => "degraded",
        (true, true) => "healthy",
    }
}

fn upload_stats(metrics: &AppMetrics) -> serde_json::Value {
    let uploads = metrics.uploads;
    let finished = uploads.succeeded + uploads.failed;

    json!({
        "succeeded": uploads.succeeded,
        "failed": uploads.failed,
        "in_flight": uploads.in_flight,
        "bytes_received": uploads.bytes_received,
        "success_rate": if finished > 0 {
            uploads.succeeded as f64 / finished as f64
        } else {
            0.0
        }
    })
}

pub async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let config = state.get_config();
    let database_ok = db::ping(&state.db).await;
    let media_configured = state.media.is_configured();
    let status = overall_status(database_ok, media_configured);

    let body = json!({
        "status": status,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": state.get_uptime_seconds(),
        "service": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "host": config.server.host,
            "port": config.server.port
        },
        "dependencies": {
            "database": {
                "reachable": database_ok
            },
            "media_host": {
                "name": state.media.name(),
                "configured": media_configured,
                "resource_type": config.media.resource_type
            }
        },
        "metrics": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate()
        },
        "uploads": upload_stats(&metrics)
    });

    if database_ok {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

pub async fn detailed_metrics(state: web::Data<AppState>) -> HttpResponse {
    let metrics = state.get_metrics_snapshot();
    let uptime_seconds = state.get_uptime_seconds();

    let mut endpoint_stats: Vec<_> = metrics
        .endpoint_metrics
        .iter()
        .map(|(endpoint, metric)| {
            json!({
                "endpoint": endpoint,
                "request_count": metric.request_count,
                "error_count": metric.error_count,
                "error_rate": metric.error_rate(),
                "average_duration_ms": metric.average_duration_ms(),
                "total_duration_ms": metric.total_duration_ms
            })
        })
        .collect();
    endpoint_stats.sort_by(|a, b| a["endpoint"].as_str().cmp(&b["endpoint"].as_str()));

    HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "uptime_seconds": uptime_seconds,
        "overall": {
            "total_requests": metrics.request_count,
            "total_errors": metrics.error_count,
            "error_rate": metrics.error_rate(),
            "requests_per_second": if uptime_seconds > 0 {
                metrics.request_count as f64 / uptime_seconds as f64
            } else {
                0.0
            }
        },
        "uploads": upload_stats(&metrics),
        "endpoints": endpoint_stats,
        "limits": {
            "max_file_size_bytes": state.get_config().uploads.max_file_size_bytes
        }
    }))
}
