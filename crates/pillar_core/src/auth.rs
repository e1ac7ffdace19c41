//! Bearer-token verification against the hosted identity service.
//!
//! # Responsibility
//! - Extract bearer tokens from `Authorization` header values.
//! - Resolve a token to a `UserIdentity`, or report why it cannot be.
//!
//! # Invariants
//! - Raw tokens never reach the log; only `token_fingerprint` does.
//! - A single request per verification, bounded by a fixed timeout, no retry.

use crate::example_gen::UpstreamError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

const IDENTITY_TIMEOUT: Duration = Duration::from_secs(10);

/// Signed-in user as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(rename = "id")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug)]
pub enum AuthError {
    /// No `Authorization: Bearer` credential was supplied.
    MissingCredential,
    /// The identity service rejected the credential.
    InvalidCredential,
    /// The identity service could not be reached or answered unexpectedly.
    Upstream(UpstreamError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCredential => write!(f, "missing bearer credential"),
            Self::InvalidCredential => write!(f, "credential rejected by identity service"),
            Self::Upstream(err) => write!(f, "identity service unavailable: {err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Upstream(err) => Some(err),
            Self::MissingCredential | Self::InvalidCredential => None,
        }
    }
}

/// Resolves bearer tokens to identities.
pub trait IdentityVerifier {
    fn verify(&self, bearer_token: &str) -> Result<UserIdentity, AuthError>;
}

/// Returns the token of a `Bearer` authorization header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.map(str::trim).ok_or(AuthError::MissingCredential)?;
    let (scheme, token) = value
        .split_once(' ')
        .ok_or(AuthError::MissingCredential)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::MissingCredential);
    }
    Ok(token)
}

/// Log-safe stand-in for a token: its length and masked last four chars.
pub fn token_fingerprint(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
    format!("len{}:***{}", chars.len(), tail)
}

/// `IdentityVerifier` backed by the identity service's `/auth/v1/user`.
#[derive(Debug, Clone)]
pub struct HttpIdentityVerifier {
    base_url: String,
    api_key: String,
    agent: ureq::Agent,
}

impl HttpIdentityVerifier {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent: ureq::AgentBuilder::new().timeout(IDENTITY_TIMEOUT).build(),
        }
    }
}

impl IdentityVerifier for HttpIdentityVerifier {
    fn verify(&self, bearer_token: &str) -> Result<UserIdentity, AuthError> {
        let started_at = Instant::now();
        let fingerprint = token_fingerprint(bearer_token);
        let url = format!("{}/auth/v1/user", self.base_url);

        let response = self
            .agent
            .get(&url)
            .set("Authorization", &format!("Bearer {bearer_token}"))
            .set("apikey", &self.api_key)
            .call();

        let result = match response {
            Ok(response) => response
                .into_json::<UserIdentity>()
                .map_err(|err| AuthError::Upstream(UpstreamError::Unknown(err.to_string()))),
            Err(ureq::Error::Status(401 | 403, _)) => Err(AuthError::InvalidCredential),
            Err(ureq::Error::Status(code, _)) => Err(AuthError::Upstream(UpstreamError::Unknown(
                format!("identity service returned status {code}"),
            ))),
            Err(err) => Err(AuthError::Upstream(UpstreamError::Unknown(err.to_string()))),
        };

        match &result {
            Ok(_) => info!(
                "event=auth_verify module=auth status=ok token_fingerprint={} duration_ms={}",
                fingerprint,
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=auth_verify module=auth status=error token_fingerprint={} duration_ms={} error={}",
                fingerprint,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}
