use crate::errors::AppError;
use crate::payload::SchemaVariant;
use crate::scoring_client::strip_bearer_prefix;
use std::fmt;
use std::time::Duration;
use url::Url;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;

/// Bearer token for the scoring endpoint, stored without any `Bearer ` prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Normalizes a configured token. Accepts values with or without the prefix.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let token = strip_bearer_prefix(raw);
        if token.is_empty() {
            return Err(AppError::ConfigurationError(
                "scoring token cannot be empty".to_string(),
            ));
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header, always carrying exactly one prefix.
    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Process-wide configuration, loaded once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub scoring_url: Url,
    pub scoring_token: BearerToken,
    pub scoring_schema: SchemaVariant,
    pub request_timeout: Duration,
    /// Disables TLS certificate verification. Local development only.
    pub accept_invalid_certs: bool,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            scoring_url: non_empty("SCORING_URL")
                .or_else(|| non_empty("URL"))
                .ok_or_else(|| {
                    AppError::ConfigurationError(
                        "SCORING_URL (or URL) environment variable required".to_string(),
                    )
                })
                .and_then(|raw| parse_endpoint(&raw))?,
            scoring_token: non_empty("SCORING_TOKEN")
                .or_else(|| non_empty("TOKEN"))
                .ok_or_else(|| {
                    AppError::ConfigurationError(
                        "SCORING_TOKEN (or TOKEN) environment variable required".to_string(),
                    )
                })
                .and_then(|raw| BearerToken::parse(&raw))?,
            scoring_schema: match non_empty("SCORING_SCHEMA") {
                Some(raw) => raw.parse::<SchemaVariant>()?,
                None => SchemaVariant::default(),
            },
            request_timeout: match non_empty("SCORING_TIMEOUT_SECS") {
                Some(raw) => parse_timeout(&raw)?,
                None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            },
            accept_invalid_certs: match non_empty("SCORING_INSECURE_SKIP_TLS_VERIFY") {
                Some(raw) => parse_flag("SCORING_INSECURE_SKIP_TLS_VERIFY", &raw)?,
                None => false,
            },
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: match non_empty("PORT") {
                Some(raw) => parse_port(&raw)?,
                None => DEFAULT_PORT,
            },
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Scoring URL: {}", config.scoring_url);
        tracing::debug!("Scoring schema: {}", config.scoring_schema);
        tracing::debug!("Scoring timeout: {:?}", config.request_timeout);
        tracing::debug!("Listen address: {}:{}", config.host, config.port);
        if config.accept_invalid_certs {
            tracing::warn!(
                "TLS certificate verification is DISABLED for the scoring endpoint; never use this outside local development"
            );
        }

        Ok(config)
    }
}

fn parse_endpoint(raw: &str) -> Result<Url, AppError> {
    let url = Url::parse(raw.trim()).map_err(|e| {
        AppError::ConfigurationError(format!("SCORING_URL is not a valid URL: {}", e))
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::ConfigurationError(format!(
            "SCORING_URL must use http:// or https://, got {}://",
            other
        ))),
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, AppError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(AppError::ConfigurationError(
            "SCORING_TIMEOUT_SECS must be a positive number of seconds".to_string(),
        )),
    }
}

fn parse_port(raw: &str) -> Result<u16, AppError> {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(AppError::ConfigurationError(
            "PORT must be a valid number between 1-65535".to_string(),
        )),
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::ConfigurationError(format!(
            "{} must be true or false",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SCORING_URL", "https://scoring.example.com/v4/deployments/churn/predictions"),
            ("SCORING_TOKEN", "abc123"),
        ]))
        .unwrap();

        assert_eq!(config.scoring_token.as_str(), "abc123");
        assert_eq!(config.scoring_schema, SchemaVariant::Tabular);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(!config.accept_invalid_certs);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
    }

    #[test]
    fn test_legacy_variable_names() {
        let config = Config::from_lookup(lookup(&[
            ("URL", "http://localhost:9000/score"),
            ("TOKEN", "Bearer legacy"),
            ("SCORING_SCHEMA", "flat"),
            ("PORT", "8080"),
        ]))
        .unwrap();

        assert_eq!(config.scoring_url.as_str(), "http://localhost:9000/score");
        assert_eq!(config.scoring_token.header_value(), "Bearer legacy");
        assert_eq!(config.scoring_schema, SchemaVariant::Flat);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_missing_endpoint_or_token_is_fatal() {
        let err = Config::from_lookup(lookup(&[("SCORING_TOKEN", "abc")])).unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));

        let err = Config::from_lookup(lookup(&[("SCORING_URL", "https://x.example.com")]))
            .unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));

        let err = Config::from_lookup(lookup(&[
            ("SCORING_URL", "https://x.example.com"),
            ("SCORING_TOKEN", "Bearer "),
        ]))
        .unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let base = [
            ("SCORING_URL", "https://x.example.com"),
            ("SCORING_TOKEN", "abc"),
        ];
        for (key, value) in [
            ("SCORING_URL", "ftp://x.example.com"),
            ("SCORING_URL", "not a url"),
            ("SCORING_SCHEMA", "xml"),
            ("SCORING_TIMEOUT_SECS", "0"),
            ("SCORING_INSECURE_SKIP_TLS_VERIFY", "maybe"),
            ("PORT", "70000"),
            ("PORT", "0"),
        ] {
            let mut vars = base.to_vec();
            vars.retain(|(k, _)| *k != key);
            vars.push((key, value));
            let result = Config::from_lookup(lookup(&vars));
            assert!(
                matches!(result, Err(AppError::ConfigurationError(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn test_insecure_tls_is_opt_in() {
        let config = Config::from_lookup(lookup(&[
            ("SCORING_URL", "https://localhost:8443"),
            ("SCORING_TOKEN", "abc"),
            ("SCORING_INSECURE_SKIP_TLS_VERIFY", "true"),
        ]))
        .unwrap();
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_token_is_redacted_in_debug() {
        let token = BearerToken::parse("secret-value").unwrap();
        assert!(!format!("{:?}", token).contains("secret-value"));
    }
}
