pub mod health;
pub mod ingest;
pub mod proxy;
pub mod ws;

use crate::state::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(ws::router())
        .merge(ingest::router())
        .merge(proxy::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::subscribers::SubscriberRegistry;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eeg_core::auth::JwtVerifier;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        std::env::set_var("DATABASE_URL", "postgresql://postgres@localhost/eeg_test");
        std::env::set_var("JWT_SECRET_KEY", "test-secret");
        let config = Arc::new(GatewayConfig::from_env().expect("config"));
        let mut client_config = rdkafka::config::ClientConfig::new();
        client_config.set("bootstrap.servers", &config.shared.kafka_broker);
        let producer: rdkafka::producer::FutureProducer =
            client_config.create().expect("producer");

        AppState {
            jwt: JwtVerifier::new(
                &config.shared.jwt_secret_key,
                &config.shared.jwt_issuer,
                &config.shared.jwt_audience,
            ),
            config,
            producer,
            eeg_registry: Arc::new(SubscriberRegistry::default()),
            metrics_registry: Arc::new(SubscriberRegistry::default()),
            http: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn bulk_ingest_without_auth_is_rejected() {
        let app = router(test_state());
        let request = Request::builder()
            .method("POST")
            .uri("/eeg/bulk")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"records":[]}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn healthz_requires_no_auth() {
        let app = router(test_state());
        let request = Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
