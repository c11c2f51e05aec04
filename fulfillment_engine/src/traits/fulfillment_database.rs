use panel_common::Amount;

use crate::{
    db_types::{NewOrder, Order, OrderPricing, OrderRequest, RequestKind, RequestStatus},
    traits::{AuditLog, FulfillmentError, OrderManagement},
};

/// The state changes behind order placement, forwarding and refill/cancel requests.
///
/// Every method is atomic: either all of its effects are persisted or none are.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + OrderManagement + AuditLog {
    /// The URL of the database
    fn url(&self) -> &str;

    /// Takes a new order, and in a single atomic transaction,
    /// * stores the order with status `pending`,
    /// * checks that the user can afford it, and
    /// * debits the price from the user's balance.
    ///
    /// If the balance is insufficient, nothing is stored and [`FulfillmentError::InsufficientBalance`] is returned.
    async fn insert_order_and_debit(&self, order: NewOrder, pricing: OrderPricing) -> Result<Order, FulfillmentError>;

    /// Records that the provider accepted the order. In a single atomic transaction,
    /// * the provider order id is stored and the order moves to `processing`,
    /// * the order price is added to the user's lifetime spend, and the order is flagged as having recorded it.
    ///
    /// Fails with [`FulfillmentError::OrderAlreadyForwarded`] if the order already has a provider reference.
    async fn record_forward_success(
        &self,
        order_id: i64,
        provider_order_id: &str,
        charge: Option<Amount>,
    ) -> Result<Order, FulfillmentError>;

    /// Flags the order as having failed to forward. The order stays `pending`.
    async fn record_forward_failure(&self, order_id: i64) -> Result<Order, FulfillmentError>;

    /// Creates a `pending` request, unless a live one of the same kind exists for the order, in which case
    /// [`FulfillmentError::LiveRequestExists`] is returned.
    async fn create_request(
        &self,
        kind: RequestKind,
        order_id: i64,
        user_id: i64,
        reason: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError>;

    async fn resolve_request(
        &self,
        kind: RequestKind,
        id: i64,
        status: RequestStatus,
        provider_refill_id: Option<String>,
    ) -> Result<OrderRequest, FulfillmentError>;
}
