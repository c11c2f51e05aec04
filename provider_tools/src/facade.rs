use log::*;

use crate::{
    config::ProviderConfig,
    error::ProviderApiError,
    request_builder::{ForwardOrder, ProviderRequest, RequestBuilder},
    response_parser::{CancelReceipt, OrderReceipt, OrderStatusReport, RefillReceipt, ResponseParser},
    specification::create_api_spec_from_provider,
    transport::ProviderTransport,
};

/// The single point of contact with upstream providers.
///
/// Every call is a single attempt: build the request for the provider's dialect, send it, and turn the reply into a
/// canonical record. Retrying is the caller's decision.
#[derive(Clone)]
pub struct ForwardingFacade<T> {
    transport: T,
}

impl<T: ProviderTransport> ForwardingFacade<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn forward_order(
        &self,
        provider: &ProviderConfig,
        order: &ForwardOrder,
    ) -> Result<OrderReceipt, ProviderApiError> {
        let (builder, parser) = tools_for(provider);
        debug!("🔌️ Forwarding order for service {} to provider {}", order.service, provider.name);
        let body = self.send(builder.build_order_request(order)).await?;
        let receipt = parser.parse_order_response(&body)?;
        info!("🔌️ Provider {} accepted order. Provider order id: {}", provider.name, receipt.provider_order_id);
        Ok(receipt)
    }

    pub async fn forward_refill(
        &self,
        provider: &ProviderConfig,
        provider_order_id: &str,
    ) -> Result<RefillReceipt, ProviderApiError> {
        let (builder, parser) = tools_for(provider);
        debug!("🔌️ Requesting refill of order {provider_order_id} from provider {}", provider.name);
        let body = self.send(builder.build_refill_request(provider_order_id)).await?;
        parser.parse_refill_response(&body)
    }

    pub async fn forward_cancel(
        &self,
        provider: &ProviderConfig,
        provider_order_id: &str,
    ) -> Result<CancelReceipt, ProviderApiError> {
        let (builder, parser) = tools_for(provider);
        debug!("🔌️ Requesting cancellation of order {provider_order_id} from provider {}", provider.name);
        let body = self.send(builder.build_cancel_request(provider_order_id)).await?;
        parser.parse_cancel_response(&body)
    }

    /// Queries the upstream status of an order. The raw payload is returned alongside the report so that it can be
    /// written to the audit log.
    pub async fn fetch_order_status(
        &self,
        provider: &ProviderConfig,
        provider_order_id: &str,
    ) -> Result<(OrderStatusReport, String), ProviderApiError> {
        let (builder, parser) = tools_for(provider);
        trace!("🔌️ Fetching status of order {provider_order_id} from provider {}", provider.name);
        let body = self.send(builder.build_order_status_request(provider_order_id)).await?;
        let report = parser.parse_order_status_response(&body)?;
        Ok((report, body))
    }

    async fn send(&self, request: ProviderRequest) -> Result<String, ProviderApiError> {
        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response.body)
        } else {
            warn!("🔌️ Provider responded with HTTP {}", response.status);
            Err(ProviderApiError::HttpStatus { status: response.status, body: response.body })
        }
    }
}

fn tools_for(provider: &ProviderConfig) -> (RequestBuilder, ResponseParser) {
    let spec = create_api_spec_from_provider(provider);
    let builder = RequestBuilder::new(spec.clone(), &provider.api_base_url, provider.api_key.clone(), provider.http_method);
    (builder, ResponseParser::new(spec))
}
