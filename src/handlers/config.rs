use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

/// `GET /api/v1/config` - current settings with credentials masked.
pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let config = state.get_config();

    Ok(HttpResponse::Ok().json(json!({
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "config": config.redacted_json()
    })))
}

/// `PUT /api/v1/config` - partial update of the runtime-adjustable settings.
pub async fn update_config(
    state: web::Data<AppState>,
    body: web::Json<serde_json::Value>,
) -> Result<HttpResponse, AppError> {
    let json_str = serde_json::to_string(&body.into_inner())?;

    let mut current_config = state.get_config();
    current_config
        .update_from_json(&json_str)
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .update_config(current_config.clone())
        .map_err(AppError::ValidationError)?;

    info!(
        max_file_size_bytes = current_config.uploads.max_file_size_bytes,
        field_name = %current_config.uploads.field_name,
        folder = %current_config.media.folder,
        "Configuration updated"
    );

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "message": "Configuration updated successfully",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "updated_config": current_config.redacted_json()
    })))
}

#[cfg(test)]
mod tests {
    use crate::config::{AppConfig, REDACTED};
    use crate::handlers::configure_routes;
    use crate::state::testing::{test_state, FakeMediaHost};
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_get_config_hides_secret() {
        let mut config = AppConfig::default();
        config.media.api_secret = "top-secret".to_string();
        let state = test_state(config, Arc::new(FakeMediaHost::default())).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/config").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["config"]["media"]["api_secret"], REDACTED);
        assert!(!json.to_string().contains("top-secret"));
    }

    #[actix_web::test]
    async fn test_update_config() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::put()
            .uri("/api/v1/config")
            .set_json(serde_json::json!({"uploads": {"max_file_size_bytes": 2048}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(state.get_config().uploads.max_file_size_bytes, 2048);

        let req = test::TestRequest::put()
            .uri("/api/v1/config")
            .set_json(serde_json::json!({"uploads": {"max_file_size_bytes": 0}}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(state.get_config().uploads.max_file_size_bytes, 2048);
    }
}
