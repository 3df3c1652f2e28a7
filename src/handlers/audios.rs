//! Read-only views of the audio reference log
//!
//! - `GET /api/v1/audios?page=N` - newest first, 50 per page
//! - `GET /api/v1/audios/{id}` - one record

use crate::db::{self, pagination::calculate_pagination};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// 1-indexed; out of range values are clamped
    pub page: Option<i64>,
}

pub async fn list_audios(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> AppResult<HttpResponse> {
    let total = db::audios::count(&state.db).await?;
    let pagination = calculate_pagination(total, query.page.unwrap_or(1));
    let audios =
        db::audios::list_page(&state.db, pagination.offset, db::pagination::PAGE_SIZE).await?;

    Ok(HttpResponse::Ok().json(json!({
        "audios": audios,
        "page": pagination.page,
        "total_pages": pagination.total_pages,
        "total": total
    })))
}

pub async fn get_audio(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let raw_id = path.into_inner();
    let id = Uuid::parse_str(&raw_id)
        .map_err(|_| AppError::BadRequest(format!("Invalid audio id '{}'", raw_id)))?;

    let record = db::audios::get(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No audio with id {}", id)))?;

    Ok(HttpResponse::Ok().json(record))
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::db;
    use crate::handlers::configure_routes;
    use crate::state::testing::{test_state, FakeMediaHost};
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_list_audios_paginates() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        for i in 0..55 {
            db::audios::insert(&state.db, &format!("https://media.test/{}.webm", i))
                .await
                .unwrap();
        }
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/audios").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["total"], 55);
        assert_eq!(json["page"], 1);
        assert_eq!(json["total_pages"], 2);
        assert_eq!(json["audios"].as_array().unwrap().len(), 50);
        assert_eq!(json["audios"][0]["audio_url"], "https://media.test/54.webm");

        let req = test::TestRequest::get().uri("/api/v1/audios?page=9").to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["page"], 2);
        assert_eq!(json["audios"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn test_get_audio() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        let record = db::audios::insert(&state.db, "https://media.test/a.webm").await.unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/audios/{}", record.id))
            .to_request();
        let json: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(json["audio_url"], "https://media.test/a.webm");
        assert_eq!(json["id"], record.id.to_string());

        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/audios/{}", uuid::Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::get().uri("/api/v1/audios/not-a-uuid").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_list_audios_rejects_bad_page() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/v1/audios?page=abc").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let json: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["error_type"], "bad_request");
    }
}
