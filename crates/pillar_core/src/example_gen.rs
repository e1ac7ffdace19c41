//! Example goal text generation through a hosted chat-completions gateway.
//!
//! # Responsibility
//! - Build the prompt for one onboarding example from tier and context.
//! - Call the gateway and map its failures onto `UpstreamError`.
//! - Provide static placeholder examples for when the gateway fails.
//!
//! # Invariants
//! - One request per call, fixed timeout, no retry.
//! - Prompt text and generated text are never logged.

use crate::model::goal::GoalTier;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of an example-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleRequest {
    pub goal_type: GoalTier,
    pub pillar_name: String,
    #[serde(default)]
    pub parent_goal_title: Option<String>,
    #[serde(default)]
    pub vision_title: Option<String>,
}

/// Failure of a hosted dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    RateLimited,
    PaymentRequired,
    Unknown(String),
}

impl Display for UpstreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate limit exceeded, please try again later"),
            Self::PaymentRequired => write!(f, "AI credits exhausted, please add funds"),
            Self::Unknown(message) => write!(f, "upstream failure: {message}"),
        }
    }
}

impl Error for UpstreamError {}

/// Produces one example goal statement.
pub trait ExampleGenerator {
    fn generate(&self, request: &ExampleRequest) -> Result<String, UpstreamError>;
}

/// Fixed system instruction for every example.
pub fn system_prompt() -> &'static str {
    "You are a goal-setting coach. Write one concise, specific, measurable goal \
     statement as an example for the user. Reply with the goal text only, in one \
     sentence, without quotes or preamble."
}

/// User prompt built from the request context.
pub fn user_prompt(request: &ExampleRequest) -> String {
    let horizon = match request.goal_type {
        GoalTier::ThreeYear => "three years",
        GoalTier::OneYear => "one year",
        GoalTier::NinetyDay => "90 days",
    };
    let mut prompt = format!(
        "Write an example {} for the life pillar \"{}\", achievable within {}.",
        request.goal_type.label(),
        request.pillar_name.trim(),
        horizon
    );
    if let Some(vision) = non_blank(request.vision_title.as_deref()) {
        prompt.push_str(&format!(" It should serve the vision \"{vision}\"."));
    }
    if let Some(parent) = non_blank(request.parent_goal_title.as_deref()) {
        prompt.push_str(&format!(" It should be a step toward the goal \"{parent}\"."));
    }
    prompt
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Static example used when generation is unavailable.
pub fn placeholder_example(tier: GoalTier, pillar: &str) -> String {
    let pillar = pillar.trim();
    let pillar = if pillar.is_empty() { "this area" } else { pillar };
    match tier {
        GoalTier::ThreeYear => {
            format!("Build lasting habits that make {pillar} a consistent strength of my life")
        }
        GoalTier::OneYear => {
            format!("Reach one clear, measurable milestone in {pillar} by the end of the year")
        }
        GoalTier::NinetyDay => {
            format!("Spend three focused sessions each week on {pillar} for the next 90 days")
        }
    }
}

/// `ExampleGenerator` posting OpenAI-compatible chat completions.
#[derive(Debug, Clone)]
pub struct GatewayExampleGenerator {
    url: String,
    api_key: String,
    model: String,
    agent: ureq::Agent,
}

impl GatewayExampleGenerator {
    pub fn new(
        url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            model: model.into(),
            agent: ureq::AgentBuilder::new().timeout(GATEWAY_TIMEOUT).build(),
        }
    }

    fn request_body(&self, request: &ExampleRequest) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system_prompt() },
                { "role": "user", "content": user_prompt(request) },
            ],
        })
    }
}

impl ExampleGenerator for GatewayExampleGenerator {
    fn generate(&self, request: &ExampleRequest) -> Result<String, UpstreamError> {
        let started_at = Instant::now();
        let body = serde_json::to_string(&self.request_body(request))
            .map_err(|err| UpstreamError::Unknown(format!("JSON serialize error: {err}")))?;

        let response = self
            .agent
            .post(&self.url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .set("Content-Type", "application/json")
            .send_string(&body);

        let result = match response {
            Ok(response) => response
                .into_string()
                .map_err(|err| UpstreamError::Unknown(err.to_string()))
                .and_then(|text| parse_completion(&text)),
            Err(ureq::Error::Status(429, _)) => Err(UpstreamError::RateLimited),
            Err(ureq::Error::Status(402, _)) => Err(UpstreamError::PaymentRequired),
            Err(ureq::Error::Status(code, _)) => Err(UpstreamError::Unknown(format!(
                "AI gateway returned status {code}"
            ))),
            Err(err) => Err(UpstreamError::Unknown(err.to_string())),
        };

        match &result {
            Ok(_) => info!(
                "event=example_generate module=example_gen status=ok tier={} duration_ms={}",
                request.goal_type.as_str(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => warn!(
                "event=example_generate module=example_gen status=error tier={} duration_ms={} error={}",
                request.goal_type.as_str(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }
}

/// Extracts the first choice's message text from a completions response.
pub fn parse_completion(body: &str) -> Result<String, UpstreamError> {
    let json: serde_json::Value = serde_json::from_str(body)
        .map_err(|err| UpstreamError::Unknown(format!("invalid gateway response: {err}")))?;
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(|text| text.trim().trim_matches('"').trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| UpstreamError::Unknown("missing completion content".to_string()))
}
