//! Example-generation HTTP endpoint.
//!
//! # Responsibility
//! - Gate every generation request on a verified bearer token.
//! - Map identity and gateway failures onto HTTP statuses.
//! - Attach CORS headers to every response, errors included.
//!
//! # Invariants
//! - No generation call is made before the caller is verified.
//! - Blocking network calls run on the blocking pool, never on the runtime.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{middleware, Json, Router};
use log::{error, info, warn};
use pillar_core::auth::{bearer_token, token_fingerprint, AuthError, IdentityVerifier};
use pillar_core::example_gen::{ExampleGenerator, ExampleRequest, UpstreamError};
use serde_json::json;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Shared dependencies of the handlers.
#[derive(Clone)]
pub struct AppState {
    verifier: Arc<dyn IdentityVerifier + Send + Sync>,
    generator: Arc<dyn ExampleGenerator + Send + Sync>,
}

impl AppState {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier + Send + Sync>,
        generator: Arc<dyn ExampleGenerator + Send + Sync>,
    ) -> Self {
        Self {
            verifier,
            generator,
        }
    }
}

/// Failure of one edge request.
#[derive(Debug)]
pub enum EdgeError {
    BadRequest(String),
    Auth(AuthError),
    Upstream(UpstreamError),
    Internal(String),
}

impl EdgeError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Auth(AuthError::MissingCredential | AuthError::InvalidCredential) => {
                StatusCode::UNAUTHORIZED
            }
            Self::Auth(AuthError::Upstream(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Upstream(UpstreamError::RateLimited) => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream(UpstreamError::PaymentRequired) => StatusCode::PAYMENT_REQUIRED,
            Self::Upstream(UpstreamError::Unknown(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message returned to the caller; internal details stay in the log.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Auth(AuthError::MissingCredential | AuthError::InvalidCredential) => {
                "Unauthorized".to_string()
            }
            Self::Upstream(err @ (UpstreamError::RateLimited | UpstreamError::PaymentRequired)) => {
                err.to_string()
            }
            Self::Auth(AuthError::Upstream(_))
            | Self::Upstream(UpstreamError::Unknown(_))
            | Self::Internal(_) => "Failed to generate example".to_string(),
        }
    }
}

impl Display for EdgeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest(message) => write!(f, "bad request: {message}"),
            Self::Auth(err) => write!(f, "{err}"),
            Self::Upstream(err) => write!(f, "{err}"),
            Self::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl Error for EdgeError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Auth(err) => Some(err),
            Self::Upstream(err) => Some(err),
            Self::BadRequest(_) | Self::Internal(_) => None,
        }
    }
}

impl From<AuthError> for EdgeError {
    fn from(value: AuthError) -> Self {
        Self::Auth(value)
    }
}

impl From<UpstreamError> for EdgeError {
    fn from(value: UpstreamError) -> Self {
        Self::Upstream(value)
    }
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Builds the router serving `/` and `/generate-goal-example`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", post(generate_example).options(preflight))
        .route(
            "/generate-goal-example",
            post(generate_example).options(preflight),
        )
        .layer(middleware::map_response(with_cors))
        .with_state(state)
}

async fn with_cors(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    response
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn generate_example(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let started_at = Instant::now();
    match generate(state, &headers, &body).await {
        Ok(example) => {
            info!(
                "event=edge_generate module=edge status=ok http_status=200 duration_ms={}",
                started_at.elapsed().as_millis()
            );
            (StatusCode::OK, Json(json!({ "example": example }))).into_response()
        }
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                error!(
                    "event=edge_generate module=edge status=error http_status={} duration_ms={} error={}",
                    status.as_u16(),
                    started_at.elapsed().as_millis(),
                    err
                );
            } else {
                warn!(
                    "event=edge_generate module=edge status=error http_status={} duration_ms={} error={}",
                    status.as_u16(),
                    started_at.elapsed().as_millis(),
                    err
                );
            }
            err.into_response()
        }
    }
}

async fn generate(state: AppState, headers: &HeaderMap, body: &[u8]) -> Result<String, EdgeError> {
    let header_value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    let token = bearer_token(header_value)?.to_string();
    let fingerprint = token_fingerprint(&token);

    let verifier = Arc::clone(&state.verifier);
    let identity = tokio::task::spawn_blocking(move || verifier.verify(&token))
        .await
        .map_err(|err| EdgeError::Internal(err.to_string()))??;
    info!(
        "event=edge_auth module=edge status=ok token_fingerprint={} user_id={}",
        fingerprint, identity.user_id
    );

    let request: ExampleRequest = serde_json::from_slice(body)
        .map_err(|err| EdgeError::BadRequest(format!("Invalid request body: {err}")))?;
    if request.pillar_name.trim().is_empty() {
        return Err(EdgeError::BadRequest(
            "pillarName must not be blank".to_string(),
        ));
    }

    let generator = Arc::clone(&state.generator);
    let example = tokio::task::spawn_blocking(move || generator.generate(&request))
        .await
        .map_err(|err| EdgeError::Internal(err.to_string()))??;
    Ok(example)
}
