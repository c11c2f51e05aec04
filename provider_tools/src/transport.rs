use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, Method};

use crate::{
    config::HttpMethod,
    error::ProviderApiError,
    request_builder::{ProviderRequest, RequestBody},
};

/// What came back over the wire, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: &str) -> Self {
        Self { status, body: body.to_string() }
    }

    pub fn ok(body: &str) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one provider request. Implementations make exactly one attempt and honour the request's timeout.
#[allow(async_fn_in_trait)]
pub trait ProviderTransport: Clone {
    async fn send(&self, request: ProviderRequest) -> Result<TransportResponse, ProviderApiError>;
}

/// The production transport, backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Arc<Client>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, ProviderApiError> {
        let client = Client::builder()
            .user_agent(concat!("fulfillment-panel/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }
}

impl ProviderTransport for ReqwestTransport {
    async fn send(&self, request: ProviderRequest) -> Result<TransportResponse, ProviderApiError> {
        let timeout = request.timeout;
        trace!("🔌️ Sending provider request: {request:?}");
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
        };
        let mut req = self.client.request(method, request.url.as_str()).timeout(timeout);
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        req = match &request.body {
            RequestBody::Empty => req,
            RequestBody::Form(fields) => req.form(fields),
            RequestBody::Json(value) => req.json(value),
        };
        let response = req.send().await.map_err(|e| map_reqwest_error(e, timeout))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| map_reqwest_error(e, timeout))?;
        trace!("🔌️ Provider responded with HTTP {status}. {} bytes", body.len());
        Ok(TransportResponse { status, body })
    }
}

/// The request URL can carry the provider credential in its query string, so it is stripped before the error is
/// turned into text.
fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> ProviderApiError {
    let e = e.without_url();
    if e.is_timeout() {
        ProviderApiError::Timeout { seconds: timeout.as_secs() }
    } else if e.is_connect() {
        ProviderApiError::Connection(e.to_string())
    } else {
        ProviderApiError::Transport(e.to_string())
    }
}
