use crate::config::QueryConfig;
use axum::extract::FromRef;
use eeg_aggregation::AggregationEngine;
use eeg_core::auth::JwtVerifier;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<QueryConfig>,
    pub db: PgPool,
    pub jwt: JwtVerifier,
    pub aggregation: Arc<AggregationEngine>,
}

impl FromRef<AppState> for JwtVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
