use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

/// JWT claims this system issues and validates. `sub` carries the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing authorization header")]
    Missing,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token expired")]
    Expired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": message }))).into_response()
    }
}

/// Verifies bearer tokens against a single HS256 signing key, matching
/// §4.4's JWT contract (issuer/audience enforced, expiry enforced, nbf
/// checked with a 30s skew tolerance).
#[derive(Clone)]
pub struct JwtVerifier {
    key: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl JwtVerifier {
    pub fn new(secret: &str, issuer: &str, audience: &str) -> Self {
        let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.leeway = 30;
        validation.validate_nbf = true;

        JwtVerifier {
            key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
                other => AuthError::Invalid(other.to_string()),
            })
    }

    pub fn issue(&self, encoding_key: &jsonwebtoken::EncodingKey, claims: &Claims) -> Result<String, AuthError> {
        jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            claims,
            encoding_key,
        )
        .map_err(|err| AuthError::Invalid(err.to_string()))
    }
}

/// The authenticated identity attached to a request after successful
/// verification, extracted by handlers via `AuthUser`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtVerifier: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = JwtVerifier::from_ref(state);
        let token = bearer_token(parts).ok_or(AuthError::Missing)?;
        let claims = verifier.verify(&token)?;
        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}

use axum::extract::FromRef;

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> (JwtVerifier, jsonwebtoken::EncodingKey) {
        let secret = "test-secret";
        (
            JwtVerifier::new(secret, "eeg-platform", "eeg-clients"),
            jsonwebtoken::EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    #[test]
    fn verifies_a_freshly_issued_token() {
        let (verifier, encoding_key) = verifier();
        let claims = Claims {
            sub: "user-1".to_string(),
            iss: "eeg-platform".to_string(),
            aud: "eeg-clients".to_string(),
            exp: (chrono::Utc::now().timestamp()) + 3600,
            nbf: None,
        };
        let token = verifier.issue(&encoding_key, &claims).unwrap();
        let decoded = verifier.verify(&token).unwrap();
        assert_eq!(decoded.sub, "user-1");
    }

    #[test]
    fn rejects_an_expired_token() {
        let (verifier, encoding_key) = verifier();
        let claims = Claims {
            sub: "user-1".to_string(),
            iss: "eeg-platform".to_string(),
            aud: "eeg-clients".to_string(),
            exp: chrono::Utc::now().timestamp() - 3600,
            nbf: None,
        };
        let token = verifier.issue(&encoding_key, &claims).unwrap();
        assert!(matches!(verifier.verify(&token), Err(AuthError::Expired)));
    }

    #[test]
    fn rejects_a_tampered_signature() {
        let (verifier, encoding_key) = verifier();
        let claims = Claims {
            sub: "user-1".to_string(),
            iss: "eeg-platform".to_string(),
            aud: "eeg-clients".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            nbf: None,
        };
        let mut token = verifier.issue(&encoding_key, &claims).unwrap();
        token.push_str("tampered");
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn rejects_a_token_not_yet_valid() {
        let (verifier, encoding_key) = verifier();
        let claims = Claims {
            sub: "user-1".to_string(),
            iss: "eeg-platform".to_string(),
            aud: "eeg-clients".to_string(),
            exp: chrono::Utc::now().timestamp() + 3600,
            nbf: Some(chrono::Utc::now().timestamp() + 300),
        };
        let token = verifier.issue(&encoding_key, &claims).unwrap();
        assert!(verifier.verify(&token).is_err());
    }
}
