use crate::kafka::publish_raw_batch;
use crate::state::AppState;
use crate::subscribers::ServerMessage;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Router;
use eeg_core::bus::{KernelSelector, RawBatch, RawRecord};
use eeg_core::ids::raw_batch_dedup_key;
use serde::Deserialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: String,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    records: Vec<RawRecord>,
    #[serde(default)]
    duration: Option<u64>,
}

const PING_INTERVAL: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

async fn ws_eeg(
    ws: WebSocketUpgrade,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> axum::response::Response {
    match state.jwt.verify(&query.token) {
        Ok(claims) => ws.on_upgrade(move |socket| handle_eeg_stream(socket, state, claims.sub)),
        Err(_) => close_unauthorized(ws),
    }
}

async fn ws_metrics(
    ws: WebSocketUpgrade,
    Query(query): Query<TokenQuery>,
    State(state): State<AppState>,
) -> axum::response::Response {
    match state.jwt.verify(&query.token) {
        Ok(claims) => ws.on_upgrade(move |socket| handle_metrics_stream(socket, state, claims.sub)),
        Err(_) => close_unauthorized(ws),
    }
}

fn close_unauthorized(ws: WebSocketUpgrade) -> axum::response::Response {
    ws.on_upgrade(|mut socket: WebSocket| async move {
        let _ = socket
            .send(Message::Close(Some(axum::extract::ws::CloseFrame {
                code: 1008,
                reason: "unauthorized".into(),
            })))
            .await;
    })
}

/// Client publishes raw frames; the server republishes each accepted
/// frame to the raw bus topic and fans it back out to every other live
/// `/ws/eeg` connection owned by the same user.
async fn handle_eeg_stream(mut socket: WebSocket, state: AppState, user_id: String) {
    let Ok(user_uuid) = Uuid::parse_str(&user_id) else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let mut rx = state.eeg_registry.subscribe(user_uuid);
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::info!(%user_id, "closing idle /ws/eeg connection");
                    break;
                }
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        if let Ok(text) = serde_json::to_string(&message) {
                            if socket.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if let Ok(frame) = serde_json::from_str::<InboundFrame>(&text) {
                            handle_inbound_frame(&state, user_uuid, frame).await;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, %user_id, "ws/eeg receive error");
                        break;
                    }
                }
            }
        }
    }
}

async fn handle_inbound_frame(state: &AppState, user_uuid: Uuid, frame: InboundFrame) {
    if frame.records.is_empty() {
        return;
    }
    let first_ts = frame.records[0].timestamp.timestamp_micros();
    let dedup_key = raw_batch_dedup_key(&user_uuid.to_string(), first_ts);
    let count = frame.records.len();
    let batch = RawBatch {
        user_id: user_uuid,
        records: frame.records,
        duration: frame.duration,
        attempts: 0,
        kernel: KernelSelector::FftOnly,
    };

    if let Err(err) = publish_raw_batch(&state.producer, &batch, &dedup_key).await {
        tracing::warn!(error = %err, %user_uuid, "failed to publish ws/eeg frame");
        return;
    }

    let echo = ServerMessage::EegFrame {
        user_id: user_uuid,
        count,
        data: serde_json::to_value(&batch.records).unwrap_or_default(),
    };
    state.eeg_registry.dispatch(user_uuid, echo);
}

/// Server-only push of processed metrics; the client sends nothing of
/// substance beyond keepalive pongs.
async fn handle_metrics_stream(mut socket: WebSocket, state: AppState, user_id: String) {
    let Ok(user_uuid) = Uuid::parse_str(&user_id) else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };

    let mut rx = state.metrics_registry.subscribe(user_uuid);
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::info!(%user_id, "closing idle /ws/metrics connection");
                    break;
                }
                if socket.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
            outbound = rx.recv() => {
                match outbound {
                    Some(message) => {
                        if let Ok(text) = serde_json::to_string(&message) {
                            if socket.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                    }
                    None => break,
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Pong(_))) => last_pong = Instant::now(),
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws/eeg", get(ws_eeg))
        .route("/ws/metrics", get(ws_metrics))
}
