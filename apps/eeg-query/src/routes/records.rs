use crate::state::AppState;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use eeg_core::auth::AuthUser;
use eeg_core::models::EegRecordRow;
use eeg_core::AppError;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct RecordsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[utoipa::path(get, path = "/eeg/latest", responses((status = 200, body = EegRecordRow)))]
async fn latest(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
) -> Result<Json<Option<EegRecordRow>>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;
    let row = sqlx::query_as::<_, EegRecordRow>(
        "SELECT * FROM eeg_records WHERE user_id = $1 ORDER BY timestamp DESC LIMIT 1",
    )
    .bind(user_uuid)
    .fetch_optional(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;
    Ok(Json(row))
}

#[utoipa::path(get, path = "/eeg/records", params(RecordsQuery), responses((status = 200, body = [EegRecordRow])))]
async fn list_records(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Vec<EegRecordRow>>, AppError> {
    let user_uuid = Uuid::parse_str(&user_id).map_err(|_| AppError::unauthorized("invalid subject"))?;
    let limit = query.limit.clamp(1, 1000);
    let rows = sqlx::query_as::<_, EegRecordRow>(
        "SELECT * FROM eeg_records WHERE user_id = $1 ORDER BY timestamp DESC LIMIT $2",
    )
    .bind(user_uuid)
    .bind(limit)
    .fetch_all(&state.db)
    .await
    .map_err(eeg_core::map_db_error)?;
    Ok(Json(rows))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/eeg/latest", get(latest))
        .route("/eeg/records", get(list_records))
}
