use crate::{
    db_types::{
        AffiliateCommission,
        NewProviderOrderLog,
        Order,
        OrderDetails,
        OrderRequest,
        Provider,
        ProviderOrderLog,
        RequestKind,
        Service,
        User,
    },
    traits::FulfillmentError,
};

/// Read access to the records the engine works with.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, FulfillmentError>;

    /// The order together with the user name and service display fields.
    async fn fetch_order_details(&self, id: i64) -> Result<Option<OrderDetails>, FulfillmentError>;

    async fn fetch_user(&self, id: i64) -> Result<Option<User>, FulfillmentError>;

    async fn fetch_service(&self, id: i64) -> Result<Option<Service>, FulfillmentError>;

    async fn fetch_provider(&self, id: i64) -> Result<Option<Provider>, FulfillmentError>;

    /// Bulk-loads providers. Unknown ids are left out of the result.
    async fn fetch_providers(&self, ids: &[i64]) -> Result<Vec<Provider>, FulfillmentError>;

    /// The audit trail for the order, oldest entry first.
    async fn fetch_provider_logs(&self, order_id: i64) -> Result<Vec<ProviderOrderLog>, FulfillmentError>;

    /// All refill or cancel requests for the order, oldest first.
    async fn fetch_requests(&self, kind: RequestKind, order_id: i64) -> Result<Vec<OrderRequest>, FulfillmentError>;

    async fn fetch_commissions(&self, order_id: i64) -> Result<Vec<AffiliateCommission>, FulfillmentError>;
}

/// The append-only provider audit trail.
#[allow(async_fn_in_trait)]
pub trait AuditLog: Clone {
    async fn insert_provider_log(&self, log: NewProviderOrderLog) -> Result<ProviderOrderLog, FulfillmentError>;
}
