use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use eeg_core::auth::AuthUser;
use eeg_core::AppError;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);
const MEDIA_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(120);
const HOP_BY_HOP_RESPONSE_HEADERS: &[&str] = &["content-encoding", "transfer-encoding", "connection"];

/// Forwards any authenticated request under `/proxy/{service}/...` to the
/// corresponding back-end base URL, preserving method/body/query,
/// overwriting `authorization`, and injecting `x-user-id`/`x-request-id`.
/// Hop-by-hop response headers are stripped before the client sees them.
async fn forward(
    State(state): State<AppState>,
    AuthUser { user_id }: AuthUser,
    request: Request,
) -> Result<Response, AppError> {
    let path = request.uri().path().to_string();
    let Some((service, rest)) = path.strip_prefix("/proxy/").and_then(|p| p.split_once('/')) else {
        return Err(AppError::not_found("unknown proxy route"));
    };

    let base_url = match service {
        "core" => state.config.shared.core_service_url.as_deref(),
        "eeg" => state.config.shared.eeg_service_url.as_deref(),
        "media" => state.config.shared.ocr_stt_service_url.as_deref(),
        _ => None,
    }
    .ok_or_else(|| AppError::not_found("no upstream configured for this service"))?;

    let query = request.uri().query().map(|q| format!("?{q}")).unwrap_or_default();
    let upstream_uri: Uri = format!("{base_url}/{rest}{query}")
        .parse()
        .map_err(|_| AppError::internal("invalid upstream URL"))?;

    let timeout = if service == "media" {
        MEDIA_UPSTREAM_TIMEOUT
    } else {
        DEFAULT_UPSTREAM_TIMEOUT
    };

    let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
        .map_err(|_| AppError::bad_request("unsupported method"))?;

    let mut headers = reqwest::header::HeaderMap::new();
    for (name, value) in request.headers().iter() {
        if name == axum::http::header::HOST {
            continue;
        }
        if let Ok(v) = reqwest::header::HeaderValue::from_bytes(value.as_bytes()) {
            headers.insert(
                reqwest::header::HeaderName::from_bytes(name.as_str().as_bytes()).unwrap(),
                v,
            );
        }
    }
    headers.insert("x-user-id", user_id.parse().unwrap_or(reqwest::header::HeaderValue::from_static("")));
    headers.insert(
        "x-request-id",
        Uuid::new_v4().to_string().parse().unwrap(),
    );

    let body_stream = request.into_body().into_data_stream();
    let upstream_body = reqwest::Body::wrap_stream(body_stream);

    let upstream_response = state
        .http
        .request(method, upstream_uri.to_string())
        .headers(headers)
        .body(upstream_body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|err| {
            if err.is_timeout() {
                AppError::gateway_timeout("upstream timed out")
            } else if err.is_body() {
                // The request body is our client's incoming stream, not the
                // upstream's response — a body error here means the client
                // went away mid-upload.
                AppError::client_closed_request("client disconnected while streaming request body")
            } else {
                AppError::bad_gateway(format!("upstream unreachable: {err}"))
            }
        })?;

    let status = StatusCode::from_u16(upstream_response.status().as_u16())
        .unwrap_or(StatusCode::BAD_GATEWAY);
    let mut response_headers = HeaderMap::new();
    for (name, value) in upstream_response.headers().iter() {
        if HOP_BY_HOP_RESPONSE_HEADERS.contains(&name.as_str()) {
            continue;
        }
        if let Ok(v) = axum::http::HeaderValue::from_bytes(value.as_bytes()) {
            response_headers.insert(
                axum::http::HeaderName::from_bytes(name.as_str().as_bytes()).unwrap(),
                v,
            );
        }
    }

    let body_stream = upstream_response.bytes_stream();
    let mut response = Response::builder().status(status);
    *response.headers_mut().unwrap() = response_headers;
    response
        .body(Body::from_stream(body_stream))
        .map_err(|_| AppError::internal("failed to build proxied response"))
        .map(|r| r.into_response())
}

pub fn router() -> Router<AppState> {
    Router::new().route("/proxy/{*path}", any(forward))
}
