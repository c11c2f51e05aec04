use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ProviderApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Provider did not respond within {seconds}s")]
    Timeout { seconds: u64 },
    #[error("Could not connect to provider: {0}")]
    Connection(String),
    #[error("Provider request failed: {0}")]
    Transport(String),
    #[error("Provider responded with HTTP {status}. {body}")]
    HttpStatus { status: u16, body: String },
    #[error("Provider returned an empty response")]
    EmptyResponse,
    #[error("Could not parse provider response as JSON: {message}")]
    InvalidJson { message: String, body: String },
    #[error("Provider rejected the request: {message}")]
    Rejected { message: String, body: String },
    #[error("Provider response is missing the '{field}' field")]
    MissingField { field: String, body: String },
}

impl ProviderApiError {
    /// The raw payload the provider sent back, if there was one. Audit log entries keep this for forensic replay.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::HttpStatus { body, .. } |
            Self::InvalidJson { body, .. } |
            Self::Rejected { body, .. } |
            Self::MissingField { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }

    /// True when the provider answered and explicitly refused the request (as opposed to a transport or parse
    /// failure).
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
