use std::{fmt::Display, str::FromStr, time::Duration};

use log::*;
use panel_common::Secret;

use crate::dialect::ApiDialect;

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
}

impl Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            other => Err(format!("Unsupported HTTP method: {other}")),
        }
    }
}

impl HttpMethod {
    /// Lenient conversion for stored provider configuration. Anything unrecognised falls back to `POST`.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            None => Self::default(),
            Some(s) => s.parse().unwrap_or_else(|e| {
                warn!("🔌️ {e}. Falling back to POST");
                Self::default()
            }),
        }
    }
}

/// Everything needed to talk to one upstream provider, resolved from its stored configuration.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub id: i64,
    pub name: String,
    pub api_base_url: String,
    pub api_key: Secret<String>,
    pub http_method: HttpMethod,
    pub timeout: Duration,
    pub dialect: ApiDialect,
}

impl ProviderConfig {
    pub fn new(id: i64, name: &str, api_base_url: &str, api_key: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            api_base_url: api_base_url.to_string(),
            api_key: Secret::new(api_key.to_string()),
            http_method: HttpMethod::default(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            dialect: ApiDialect::default(),
        }
    }

    pub fn with_dialect(mut self, dialect: ApiDialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_method(mut self, method: HttpMethod) -> Self {
        self.http_method = method;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Converts a stored timeout into a request timeout. Missing or non-positive values use the 30s default.
pub fn timeout_from_seconds(seconds: Option<i64>) -> Duration {
    match seconds {
        Some(s) if s > 0 => Duration::from_secs(s.unsigned_abs()),
        _ => DEFAULT_PROVIDER_TIMEOUT,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lenient_http_method() {
        assert_eq!(HttpMethod::from_config(Some("get")), HttpMethod::Get);
        assert_eq!(HttpMethod::from_config(Some("PATCH")), HttpMethod::Post);
        assert_eq!(HttpMethod::from_config(None), HttpMethod::Post);
    }

    #[test]
    fn timeouts() {
        assert_eq!(timeout_from_seconds(Some(5)), Duration::from_secs(5));
        assert_eq!(timeout_from_seconds(Some(0)), DEFAULT_PROVIDER_TIMEOUT);
        assert_eq!(timeout_from_seconds(None), DEFAULT_PROVIDER_TIMEOUT);
    }
}
