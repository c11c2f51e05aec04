use fulfillment_engine::{
    db_types::{
        AffiliateCommission,
        NewProviderOrderLog,
        Order,
        OrderDetails,
        OrderRequest,
        OrderSyncUpdate,
        Provider,
        ProviderOrderLog,
        RequestKind,
        Service,
        SyncCandidate,
        User,
    },
    AuditLog,
    CancellationOutcome,
    FulfillmentError,
    OrderManagement,
    SyncDatabase,
};
use mockall::mock;
use provider_tools::{ProviderApiError, ProviderRequest, ProviderTransport, TransportResponse};

mock! {
    pub SyncStore {}
    impl Clone for SyncStore {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for SyncStore {
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, FulfillmentError>;
        async fn fetch_order_details(&self, id: i64) -> Result<Option<OrderDetails>, FulfillmentError>;
        async fn fetch_user(&self, id: i64) -> Result<Option<User>, FulfillmentError>;
        async fn fetch_service(&self, id: i64) -> Result<Option<Service>, FulfillmentError>;
        async fn fetch_provider(&self, id: i64) -> Result<Option<Provider>, FulfillmentError>;
        async fn fetch_providers(&self, ids: &[i64]) -> Result<Vec<Provider>, FulfillmentError>;
        async fn fetch_provider_logs(&self, order_id: i64) -> Result<Vec<ProviderOrderLog>, FulfillmentError>;
        async fn fetch_requests(&self, kind: RequestKind, order_id: i64) -> Result<Vec<OrderRequest>, FulfillmentError>;
        async fn fetch_commissions(&self, order_id: i64) -> Result<Vec<AffiliateCommission>, FulfillmentError>;
    }
    impl AuditLog for SyncStore {
        async fn insert_provider_log(&self, log: NewProviderOrderLog) -> Result<ProviderOrderLog, FulfillmentError>;
    }
    impl SyncDatabase for SyncStore {
        async fn fetch_sync_candidates(&self, provider_id: Option<i64>, limit: usize) -> Result<Vec<SyncCandidate>, FulfillmentError>;
        async fn fetch_sync_candidates_by_ids(&self, ids: &[i64]) -> Result<Vec<SyncCandidate>, FulfillmentError>;
        async fn latest_provider_for_order(&self, order_id: i64) -> Result<Option<i64>, FulfillmentError>;
        async fn apply_sync_update(&self, order_id: i64, update: OrderSyncUpdate) -> Result<Order, FulfillmentError>;
        async fn apply_cancellation(&self, order_id: i64, update: OrderSyncUpdate) -> Result<CancellationOutcome, FulfillmentError>;
    }
}

mock! {
    pub Transport {}
    impl Clone for Transport {
        fn clone(&self) -> Self;
    }
    impl ProviderTransport for Transport {
        async fn send(&self, request: ProviderRequest) -> Result<TransportResponse, ProviderApiError>;
    }
}
