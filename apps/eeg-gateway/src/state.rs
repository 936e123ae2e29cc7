use crate::config::GatewayConfig;
use crate::subscribers::{ServerMessage, SubscriberRegistry};
use axum::extract::FromRef;
use eeg_core::auth::JwtVerifier;
use rdkafka::producer::FutureProducer;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub jwt: JwtVerifier,
    pub producer: FutureProducer,
    pub eeg_registry: Arc<SubscriberRegistry<ServerMessage>>,
    pub metrics_registry: Arc<SubscriberRegistry<ServerMessage>>,
    pub http: reqwest::Client,
}

impl FromRef<AppState> for JwtVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.jwt.clone()
    }
}
