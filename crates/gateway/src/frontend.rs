//! Embedded dashboard assets.
//!
//! The files under `frontend/` are compiled into the binary with
//! `include_str!`, so `contentcrew web` needs nothing on disk.

use axum::{
    Router,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};

const INDEX_HTML: &str = include_str!("../../../frontend/index.html");
const STYLE_CSS: &str = include_str!("../../../frontend/style.css");
const APP_JS: &str = include_str!("../../../frontend/app.js");

pub fn frontend_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/static/style.css", get(|| asset("text/css; charset=utf-8", STYLE_CSS)))
        .route(
            "/static/app.js",
            get(|| asset("application/javascript; charset=utf-8", APP_JS)),
        )
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn asset(content_type: &'static str, body: &'static str) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, content_type)], body).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn fetch(uri: &str) -> (String, String) {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = frontend_router().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (content_type, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn serves_index_html() {
        let (content_type, text) = fetch("/").await;
        assert!(content_type.starts_with("text/html"));
        assert!(text.contains("<!DOCTYPE html>"));
        assert!(text.contains("ContentCrew"));
    }

    #[tokio::test]
    async fn serves_css_and_js() {
        let (content_type, _) = fetch("/static/style.css").await;
        assert!(content_type.contains("text/css"));

        let (content_type, text) = fetch("/static/app.js").await;
        assert!(content_type.contains("javascript"));
        assert!(text.contains("/api/runs"));
    }
}
