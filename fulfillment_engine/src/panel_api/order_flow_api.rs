use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use panel_common::OrderStatus;
use provider_tools::{ForwardOrder, ForwardingFacade, ProviderTransport};

use crate::{
    db_types::{
        LogAction,
        LogStatus,
        NewOrder,
        NewProviderOrderLog,
        Order,
        OrderRequest,
        Provider,
        RequestKind,
        RequestStatus,
        Service,
    },
    helpers::price_order,
    panel_api::audit_status,
    traits::{FulfillmentDatabase, FulfillmentError},
};

/// `OrderFlowApi` handles the user-facing order flows that reach out to a provider: placing (and re-forwarding) orders,
/// and requesting refills and cancellations.
///
/// Every provider interaction is a single attempt, and every attempt leaves exactly one entry in the provider audit
/// log, whatever the outcome.
pub struct OrderFlowApi<B, T> {
    db: B,
    facade: ForwardingFacade<T>,
}

impl<B, T> Debug for OrderFlowApi<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B, T> OrderFlowApi<B, T> {
    pub fn new(db: B, facade: ForwardingFacade<T>) -> Self {
        Self { db, facade }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B, T> OrderFlowApi<B, T>
where
    B: FulfillmentDatabase,
    T: ProviderTransport,
{
    /// Places a new order on behalf of a user.
    ///
    /// The quantity must be within the service limits, and the user must be able to afford the order. The order is
    /// stored and the user debited atomically, after which the order is forwarded to the service's provider.
    ///
    /// A failed forward is not an error: the order is returned, still `pending`, with `forward_failed` set. It can be
    /// re-sent with [`Self::retry_forward`].
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, FulfillmentError> {
        let service = self.service(order.service_id).await?;
        let (provider_id, _) = service.provider_link().ok_or(FulfillmentError::ServiceNotLinked(service.id))?;
        let provider = self.active_provider(provider_id).await?;
        if order.quantity < service.min_order || order.quantity > service.max_order {
            return Err(FulfillmentError::QuantityOutOfBounds {
                quantity: order.quantity,
                min: service.min_order,
                max: service.max_order,
            });
        }
        let user = self.db.fetch_user(order.user_id).await?.ok_or(FulfillmentError::UserNotFound(order.user_id))?;
        let pricing = price_order(&service, &user, order.quantity)?;
        let order = self.db.insert_order_and_debit(order, pricing).await?;
        info!("🛒️ Order #{} placed by {}. {} {} debited", order.id, user.username, order.price, order.currency);
        self.forward(order, &service, &provider).await
    }

    /// Re-sends an order whose earlier forward failed.
    pub async fn retry_forward(&self, order_id: i64) -> Result<Order, FulfillmentError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(FulfillmentError::OrderNotFound(order_id))?;
        if order.is_forwarded() {
            return Err(FulfillmentError::OrderAlreadyForwarded(order_id));
        }
        if order.status != OrderStatus::Pending {
            return Err(FulfillmentError::InvalidOrderState {
                id: order_id,
                status: order.status,
                action: "forward".into(),
            });
        }
        let service = self.service(order.service_id).await?;
        let (provider_id, _) = service.provider_link().ok_or(FulfillmentError::ServiceNotLinked(service.id))?;
        let provider = self.active_provider(provider_id).await?;
        debug!("🛒️ Retrying forward of order #{order_id}");
        self.forward(order, &service, &provider).await
    }

    /// Asks the provider to refill a delivered order.
    ///
    /// The service must offer refills, the order must be `completed` or `partial` and still inside the service's refill
    /// window (counted from when the order was placed), and there must be no other live refill request for it.
    ///
    /// The returned request is `approved` if the provider accepted it and `failed` otherwise.
    pub async fn request_refill(
        &self,
        order_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError> {
        let order = self.users_order(order_id, user_id).await?;
        let service = self.service(order.service_id).await?;
        if !service.refill {
            return Err(FulfillmentError::RefillNotAllowed(format!("{} does not offer refills", service.name)));
        }
        if !matches!(order.status, OrderStatus::Completed | OrderStatus::Partial) {
            return Err(FulfillmentError::RefillNotAllowed(format!("Order #{order_id} is {}", order.status)));
        }
        if let Some(days) = service.refill_days {
            let deadline = order.created_at + Duration::days(days.clamp(0, 36_500));
            if Utc::now() > deadline {
                return Err(FulfillmentError::RefillNotAllowed(format!("The {days}-day refill period has passed")));
            }
        }
        let provider_order_id = order.provider_order_id.clone().ok_or(FulfillmentError::OrderNotForwarded(order_id))?;
        let (provider_id, _) = service.provider_link().ok_or(FulfillmentError::ServiceNotLinked(service.id))?;
        let provider = self.active_provider(provider_id).await?;
        let request = self.db.create_request(RequestKind::Refill, order_id, user_id, reason).await?;
        let action = LogAction::ForwardRefillOrder;
        match self.facade.forward_refill(&provider.api_config(), &provider_order_id).await {
            Ok(receipt) => {
                info!("♻️ Refill of order #{order_id} accepted by {}. Refill id: {:?}", provider.name, receipt.refill_id);
                let log = NewProviderOrderLog::success(order_id, Some(provider.id), action, &receipt.raw);
                self.audit(log).await;
                self.db.resolve_request(RequestKind::Refill, request.id, RequestStatus::Approved, receipt.refill_id).await
            },
            Err(e) => {
                warn!("♻️ Refill of order #{order_id} was not accepted by {}. {e}", provider.name);
                let e = FulfillmentError::from(e);
                self.audit_failure(order_id, &provider, action, &e).await;
                self.db.resolve_request(RequestKind::Refill, request.id, RequestStatus::Failed, None).await
            },
        }
    }

    /// Asks the provider to cancel an order that is still in progress.
    ///
    /// The service must allow cancellation, the order must not be in a terminal state, and there must be no other live
    /// cancel request for it. No money moves here: the refund happens when reconciliation sees the order cancelled
    /// upstream.
    ///
    /// The returned request is `approved` if the provider accepted it and `failed` otherwise.
    pub async fn request_cancel(
        &self,
        order_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError> {
        let order = self.users_order(order_id, user_id).await?;
        let service = self.service(order.service_id).await?;
        if !service.cancel {
            return Err(FulfillmentError::CancelNotAllowed(format!("{} cannot be cancelled", service.name)));
        }
        if order.status.is_terminal() {
            return Err(FulfillmentError::CancelNotAllowed(format!("Order #{order_id} is already {}", order.status)));
        }
        let provider_order_id = order.provider_order_id.clone().ok_or(FulfillmentError::OrderNotForwarded(order_id))?;
        let (provider_id, _) = service.provider_link().ok_or(FulfillmentError::ServiceNotLinked(service.id))?;
        let provider = self.active_provider(provider_id).await?;
        let request = self.db.create_request(RequestKind::Cancel, order_id, user_id, reason).await?;
        let action = LogAction::ForwardCancelOrder;
        match self.facade.forward_cancel(&provider.api_config(), &provider_order_id).await {
            Ok(receipt) => {
                info!("🚫️ Cancellation of order #{order_id} accepted by {}", provider.name);
                let log = NewProviderOrderLog::success(order_id, Some(provider.id), action, &receipt.raw);
                self.audit(log).await;
                self.db.resolve_request(RequestKind::Cancel, request.id, RequestStatus::Approved, None).await
            },
            Err(e) => {
                warn!("🚫️ Cancellation of order #{order_id} was not accepted by {}. {e}", provider.name);
                let e = FulfillmentError::from(e);
                self.audit_failure(order_id, &provider, action, &e).await;
                self.db.resolve_request(RequestKind::Cancel, request.id, RequestStatus::Failed, None).await
            },
        }
    }

    async fn forward(&self, order: Order, service: &Service, provider: &Provider) -> Result<Order, FulfillmentError> {
        let provider_service_id = service
            .provider_link()
            .map(|(_, sid)| sid.to_string())
            .ok_or(FulfillmentError::ServiceNotLinked(service.id))?;
        let request = ForwardOrder {
            service: provider_service_id,
            link: order.link.clone(),
            quantity: order.quantity,
            comments: order.comments.clone(),
            runs: order.runs.and_then(|r| u32::try_from(r).ok()),
            interval: order.interval.and_then(|i| u32::try_from(i).ok()),
        };
        let action = LogAction::ForwardOrder;
        match self.facade.forward_order(&provider.api_config(), &request).await {
            Ok(receipt) => {
                match self.db.record_forward_success(order.id, &receipt.provider_order_id, receipt.charge).await {
                    Ok(order) => {
                        let log = NewProviderOrderLog::success(order.id, Some(provider.id), action, &receipt.raw);
                        self.audit(log).await;
                        Ok(order)
                    },
                    Err(e) => {
                        error!(
                            "🛒️ Provider {} accepted order #{} as {}, but the order could not be updated. {e}",
                            provider.name, order.id, receipt.provider_order_id
                        );
                        let log = NewProviderOrderLog::failure(
                            order.id,
                            Some(provider.id),
                            action,
                            LogStatus::Failed,
                            &e.to_string(),
                            Some(&receipt.raw),
                        );
                        self.audit(log).await;
                        Err(e)
                    },
                }
            },
            Err(e) => {
                warn!("🛒️ Could not forward order #{} to {}. {e}", order.id, provider.name);
                let e = FulfillmentError::from(e);
                let order = self.db.record_forward_failure(order.id).await?;
                self.audit_failure(order.id, provider, action, &e).await;
                Ok(order)
            },
        }
    }

    async fn users_order(&self, order_id: i64, user_id: i64) -> Result<Order, FulfillmentError> {
        match self.db.fetch_order(order_id).await? {
            Some(order) if order.user_id == user_id => Ok(order),
            _ => Err(FulfillmentError::OrderNotFound(order_id)),
        }
    }

    async fn service(&self, id: i64) -> Result<Service, FulfillmentError> {
        self.db.fetch_service(id).await?.ok_or(FulfillmentError::ServiceNotFound(id))
    }

    async fn active_provider(&self, id: i64) -> Result<Provider, FulfillmentError> {
        let provider = self.db.fetch_provider(id).await?.ok_or(FulfillmentError::ProviderNotFound(id))?;
        if !provider.is_active() {
            return Err(FulfillmentError::ProviderNotActive { id, status: provider.status });
        }
        Ok(provider)
    }

    async fn audit_failure(&self, order_id: i64, provider: &Provider, action: LogAction, e: &FulfillmentError) {
        let raw = match e {
            FulfillmentError::ProviderError(pe) => pe.raw_response(),
            _ => None,
        };
        let log = NewProviderOrderLog::failure(order_id, Some(provider.id), action, audit_status(e), &e.to_string(), raw);
        self.audit(log).await;
    }

    async fn audit(&self, log: NewProviderOrderLog) {
        let order_id = log.order_id;
        if let Err(e) = self.db.insert_provider_log(log).await {
            error!("🧾️ Could not write audit entry for order #{order_id}. {e}");
        }
    }
}
