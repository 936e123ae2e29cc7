pub mod admin;
pub mod best_focus;
pub mod health;
pub mod range;
pub mod records;
pub mod sessions;
pub mod time_of_day;

use crate::state::AppState;
use axum::Router;
use tower_http::cors::CorsLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(range::router())
        .merge(time_of_day::router())
        .merge(best_focus::router())
        .merge(records::router())
        .merge(sessions::router())
        .merge(admin::router())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueryConfig;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use eeg_aggregation::AggregationEngine;
    use eeg_core::auth::JwtVerifier;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn test_state() -> AppState {
        std::env::set_var("DATABASE_URL", "postgresql://postgres@localhost/eeg_test");
        std::env::set_var("JWT_SECRET_KEY", "test-secret");
        let config = Arc::new(QueryConfig::from_env().expect("config"));
        let db = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.shared.database_url)
            .expect("lazy pool");

        AppState {
            jwt: JwtVerifier::new(
                &config.shared.jwt_secret_key,
                &config.shared.jwt_issuer,
                &config.shared.jwt_audience,
            ),
            aggregation: Arc::new(AggregationEngine::new(db.clone(), Duration::from_secs(3600))),
            db,
            config,
        }
    }

    #[tokio::test]
    async fn range_series_without_auth_is_rejected() {
        let app = router(test_state());
        let request = Request::builder()
            .uri("/eeg/aggregate?range=daily")
            .body(Body::empty())
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
