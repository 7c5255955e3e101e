use crate::config::Config;
use crate::errors::AppError;
use crate::models::{CustomerRecord, ScoringResponse};
use crate::payload::{build_payload, SchemaVariant};
use crate::scoring_models::parse_response;
use reqwest::header::{HeaderValue, AUTHORIZATION, CACHE_CONTROL};
use serde_json::Value;
use std::time::Duration;
use url::Url;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest slice of an error body copied into error messages and logs.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Removes every leading `Bearer` scheme marker (any case) and surrounding whitespace.
pub fn strip_bearer_prefix(token: &str) -> &str {
    let mut rest = token.trim();
    loop {
        let is_scheme = rest
            .get(..6)
            .map_or(false, |head| head.eq_ignore_ascii_case("bearer"));
        if !is_scheme {
            break;
        }
        let after = &rest[6..];
        if !after.is_empty() && !after.starts_with(char::is_whitespace) {
            break;
        }
        rest = after.trim_start();
    }
    rest
}

/// `Authorization` header value with exactly one `Bearer ` prefix.
pub fn auth_header(token: &str) -> String {
    format!("Bearer {}", strip_bearer_prefix(token))
}

/// Client for the remote churn scoring endpoint.
///
/// Holds only immutable configuration and a pooled HTTP client, so clones can be
/// shared freely between request handlers.
#[derive(Clone)]
pub struct ScoringAdapter {
    client: reqwest::Client,
    endpoint: Url,
    authorization: HeaderValue,
    schema: SchemaVariant,
}

impl ScoringAdapter {
    /// Creates a new `ScoringAdapter`.
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded process configuration (endpoint, token, schema, timeout, TLS mode).
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(CONNECT_TIMEOUT.min(config.request_timeout))
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| {
                AppError::ConfigurationError(format!("Failed to create scoring client: {}", e))
            })?;

        let mut authorization = HeaderValue::from_str(&config.scoring_token.header_value())
            .map_err(|_| {
                AppError::ConfigurationError(
                    "scoring token contains characters not allowed in an HTTP header".to_string(),
                )
            })?;
        authorization.set_sensitive(true);

        Ok(Self {
            client,
            endpoint: config.scoring_url.clone(),
            authorization,
            schema: config.scoring_schema,
        })
    }

    pub fn schema(&self) -> SchemaVariant {
        self.schema
    }

    /// Scores one customer record: build the payload, call the endpoint, interpret the answer.
    ///
    /// # Returns
    ///
    /// * `Result<ScoringResponse, AppError>` - The risk label and, for the tabular schema,
    ///   the per-tier percentages.
    pub async fn score(&self, record: &CustomerRecord) -> Result<ScoringResponse, AppError> {
        let payload = build_payload(record, self.schema);
        let raw = self.invoke(&payload).await?;

        // The caller logs the error once; it carries the body for schema-drift diagnosis
        let response = parse_response(&raw, self.schema).map_err(|e| match e {
            AppError::MalformedResponseError(msg) => AppError::MalformedResponseError(format!(
                "{} ({} schema, body: {})",
                msg,
                self.schema,
                truncate(&raw.to_string())
            )),
            other => other,
        })?;

        tracing::info!("✓ Customer scored: risk={}", response.risk_label);
        Ok(response)
    }

    /// Sends one payload to the scoring endpoint and returns the decoded JSON body.
    ///
    /// Connection failures, timeouts, non-2xx statuses and non-JSON bodies all map to
    /// `RemoteScoringError`. No retries.
    pub async fn invoke(&self, payload: &Value) -> Result<Value, AppError> {
        tracing::info!("Calling scoring endpoint: {}", self.endpoint);
        tracing::debug!("Scoring payload: {}", payload);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, self.authorization.clone())
            .header(CACHE_CONTROL, "no-cache")
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            AppError::RemoteScoringError(format!("Failed to read scoring response: {}", e))
        })?;

        if !status.is_success() {
            return Err(AppError::RemoteScoringError(format!(
                "Scoring endpoint returned {}: {}",
                status,
                truncate(&body)
            )));
        }

        let data: Value = serde_json::from_str(&body).map_err(|e| {
            AppError::RemoteScoringError(format!(
                "Scoring endpoint returned invalid JSON ({}): {}",
                e,
                truncate(&body)
            ))
        })?;

        tracing::debug!("Scoring result: {}", data);
        Ok(data)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let head: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", head)
    }
}
