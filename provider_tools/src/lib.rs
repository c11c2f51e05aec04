//! Provider integration layer.
//!
//! Upstream providers each speak their own HTTP/JSON dialect. This crate normalises them:
//! * [`ApiDialect`] and [`ApiSpecification`] describe a dialect,
//! * [`RequestBuilder`] and [`ResponseParser`] translate between the dialect and canonical records,
//! * [`ForwardingFacade`] puts the two together over an injected [`ProviderTransport`].
mod config;
mod dialect;
mod error;
mod facade;
mod request_builder;
mod response_parser;
mod specification;
mod status;
mod transport;

pub use config::{timeout_from_seconds, HttpMethod, ProviderConfig, DEFAULT_PROVIDER_TIMEOUT};
pub use dialect::ApiDialect;
pub use error::ProviderApiError;
pub use facade::ForwardingFacade;
pub use request_builder::{ForwardOrder, ProviderRequest, RequestBody, RequestBuilder};
pub use response_parser::{CancelReceipt, OrderReceipt, OrderStatusReport, RefillReceipt, ResponseParser};
pub use specification::{
    create_api_spec_from_provider,
    ActionNames,
    ApiSpecification,
    BodyEncoding,
    CredentialPlacement,
    Endpoints,
    RequestFields,
    ResponseFields,
};
pub use status::map_provider_status;
pub use transport::{ProviderTransport, ReqwestTransport, TransportResponse};
