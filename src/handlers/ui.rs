//! Recorder/uploader panel
//!
//! The browser side is a static page compiled into the binary, so the
//! service needs no separate front-end deployment.

use actix_web::{http::header::ContentType, HttpResponse};

const INDEX_HTML: &str = include_str!("../ui/index.html");
const APP_JS: &str = include_str!("../ui/app.js");

/// GET /
pub async fn serve_index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

/// GET /static/app.js
pub async fn serve_app_js() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/javascript; charset=utf-8")
        .body(APP_JS)
}

#[cfg(test)]
mod tests {
    use crate::config::AppConfig;
    use crate::handlers::configure_routes;
    use crate::state::testing::{test_state, FakeMediaHost};
    use super::APP_JS;
    use actix_web::{http::header, test as atest, web, App};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_panel_is_served() {
        let state = test_state(AppConfig::default(), Arc::new(FakeMediaHost::default())).await;
        let app = atest::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(configure_routes),
        )
        .await;

        let resp = atest::call_service(&app, atest::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
        let content_type = resp.headers().get(header::CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = atest::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("/static/app.js"));

        let resp = atest::call_service(
            &app,
            atest::TestRequest::get().uri("/static/app.js").to_request(),
        )
        .await;
        assert!(resp.status().is_success());
        let body = atest::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("/upload-audio"));
    }

    #[test]
    fn test_script_uploads_from_memory() {
        // A data URL over the storage quota must still preview and upload
        assert!(APP_JS.contains("const source = current[kind];"));
        let set_item = APP_JS.find("localStorage.setItem").unwrap();
        let guard = APP_JS[..set_item].rfind("try {").unwrap();
        assert!(APP_JS[guard..set_item].lines().count() <= 3);
    }
}
