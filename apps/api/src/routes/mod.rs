pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::evaluation::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/evaluate", post(handlers::handle_evaluate))
        .route("/api/v1/concepts", get(handlers::handle_list_concepts))
        .route("/api/v1/concepts/:key", get(handlers::handle_get_concept))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::state::build_state;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Config::from_lookup(|_| None).unwrap();
        build_router(build_state(&config).unwrap())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "fitgate");
    }

    #[tokio::test]
    async fn test_evaluate_then_hit_cache() {
        let app = app();
        let payload = json!({
            "resume_text": "Software intern. Wrote unit tests with pytest and debugged flaky CI using git.",
            "job_description": "Hybrid software engineering internship",
            "intern_level": "sophomore"
        })
        .to_string();

        let (status, first) = send(app.clone(), post_json("/api/v1/evaluate", &payload)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["cache_status"], "miss");
        assert_eq!(first["fit"]["level"], "sophomore");
        assert_eq!(first["scores"]["structure"], 75);
        assert!(first["summary"].as_str().unwrap().starts_with("Concept-coverage analysis."));
        assert!(first["fit"]["score"].as_u64().unwrap() <= 100);
        assert!(first["quality"]["warnings"]
            .as_array()
            .unwrap()
            .iter()
            .any(|w| w == "Job requires onsite/hybrid work; include your city/region to confirm location fit."));

        let (_, second) = send(app, post_json("/api/v1/evaluate", &payload)).await;
        assert_eq!(second["cache_status"], "hit");
        assert_eq!(second["evaluation_id"], first["evaluation_id"]);
    }

    #[tokio::test]
    async fn test_evaluate_accepts_empty_body_fields() {
        let (status, body) = send(app(), post_json("/api/v1/evaluate", "{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fit"]["score"], 0);
        assert_eq!(body["quality"]["warnings"][0], "Resume text is empty.");
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        let (status, _) = send(app(), post_json("/api/v1/evaluate", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_concepts() {
        let (status, body) = send(app(), get("/api/v1/concepts")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["concepts"].as_array().unwrap().len(), 10);
        assert_eq!(body["advanced_signal"], "advanced_engineering");
    }

    #[tokio::test]
    async fn test_get_concept_by_key() {
        let (status, body) = send(app(), get("/api/v1/concepts/testing")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tier"], "core");

        let (status, body) = send(app(), get("/api/v1/concepts/astrology")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
