use std::time::Duration;

use crate::{
    config::{HttpMethod, ProviderConfig, DEFAULT_PROVIDER_TIMEOUT},
    dialect::ApiDialect,
};

/// Where the provider expects the API credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialPlacement {
    /// Sent as a request header with the given name.
    Header(&'static str),
    /// Sent as a body (or query string, for GET requests) field with the given name.
    BodyField(&'static str),
}

impl Default for CredentialPlacement {
    fn default() -> Self {
        Self::BodyField("key")
    }
}

impl CredentialPlacement {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Header(name) | Self::BodyField(name) => name,
        }
    }
}

/// Path templates, relative to the provider base URL. `{id}` is replaced with the provider order id.
#[derive(Debug, Clone, Default)]
pub struct Endpoints {
    pub order: &'static str,
    pub status: &'static str,
    pub refill: &'static str,
    pub cancel: &'static str,
}

/// Dialects that multiplex every operation over one endpoint select the operation with an action field.
#[derive(Debug, Clone, Default)]
pub struct ActionNames {
    pub field: &'static str,
    pub order: &'static str,
    pub status: &'static str,
    pub refill: &'static str,
    pub cancel: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BodyEncoding {
    #[default]
    Form,
    Json,
}

/// Outbound field names.
#[derive(Debug, Clone, Default)]
pub struct RequestFields {
    pub service: &'static str,
    pub link: &'static str,
    pub quantity: &'static str,
    pub comments: &'static str,
    pub runs: &'static str,
    pub interval: &'static str,
    pub order_id: &'static str,
    pub cancel_order_ids: &'static str,
}

/// Inbound field names. Each concept lists every accepted synonym, in order of preference.
#[derive(Debug, Clone, Default)]
pub struct ResponseFields {
    pub order_id: &'static [&'static str],
    pub status: &'static [&'static str],
    pub start_count: &'static [&'static str],
    pub remains: &'static [&'static str],
    pub charge: &'static [&'static str],
    pub currency: &'static [&'static str],
    pub refill_id: &'static [&'static str],
    pub refill_available: &'static [&'static str],
    pub cancel_available: &'static [&'static str],
    pub error: &'static [&'static str],
}

/// A normalized description of one provider's API dialect.
#[derive(Debug, Clone)]
pub struct ApiSpecification {
    pub dialect: ApiDialect,
    pub method: HttpMethod,
    pub timeout: Duration,
    pub credential: CredentialPlacement,
    pub endpoints: Endpoints,
    pub actions: Option<ActionNames>,
    pub encoding: BodyEncoding,
    pub request: RequestFields,
    pub response: ResponseFields,
}

impl Default for ApiSpecification {
    fn default() -> Self {
        Self {
            dialect: ApiDialect::default(),
            method: HttpMethod::default(),
            timeout: DEFAULT_PROVIDER_TIMEOUT,
            credential: CredentialPlacement::default(),
            endpoints: Endpoints::default(),
            actions: None,
            encoding: BodyEncoding::default(),
            request: RequestFields::default(),
            response: ResponseFields::default(),
        }
    }
}

/// Maps stored provider configuration onto the description of the API dialect it speaks. This is a pure function.
pub fn create_api_spec_from_provider(provider: &ProviderConfig) -> ApiSpecification {
    ApiSpecification { method: provider.http_method, timeout: provider.timeout, ..provider.dialect.describe() }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn spec_carries_provider_settings() {
        let provider = ProviderConfig::new(1, "acme", "https://acme.example/api/v2", "k")
            .with_method(HttpMethod::Get)
            .with_timeout(Duration::from_secs(7))
            .with_dialect(ApiDialect::LegacyV1);
        let spec = create_api_spec_from_provider(&provider);
        assert_eq!(spec.method, HttpMethod::Get);
        assert_eq!(spec.timeout, Duration::from_secs(7));
        assert_eq!(spec.dialect, ApiDialect::LegacyV1);
        assert_eq!(spec.endpoints.status, "/orders/{id}");
        assert_eq!(spec.encoding, BodyEncoding::Json);
    }
}
