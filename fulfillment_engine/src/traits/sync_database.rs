use crate::{
    db_types::{Order, OrderSyncUpdate, SyncCandidate},
    traits::{AuditLog, CancellationOutcome, FulfillmentError, OrderManagement},
};

/// Candidate selection and the state changes that provider reconciliation needs.
#[allow(async_fn_in_trait)]
pub trait SyncDatabase: Clone + OrderManagement + AuditLog {
    /// Orders with an upstream reference whose service is linked to a provider (optionally, a specific provider),
    /// least recently synced first, up to `limit` of them.
    async fn fetch_sync_candidates(
        &self,
        provider_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<SyncCandidate>, FulfillmentError>;

    /// The given orders, as long as they have an upstream reference.
    async fn fetch_sync_candidates_by_ids(&self, ids: &[i64]) -> Result<Vec<SyncCandidate>, FulfillmentError>;

    /// The provider that most recently handled the order, according to the audit trail.
    async fn latest_provider_for_order(&self, order_id: i64) -> Result<Option<i64>, FulfillmentError>;

    /// Writes the changed fields and stamps the sync time. If the order moves into `completed`, its pending affiliate
    /// commissions are approved in the same transaction.
    async fn apply_sync_update(&self, order_id: i64, update: OrderSyncUpdate) -> Result<Order, FulfillmentError>;

    /// Applies an upstream cancellation. In a single atomic transaction,
    /// * the one-time refund marker on the order is claimed,
    /// * if the claim succeeded, the user is credited with the refund and their lifetime spend is reduced,
    /// * the changed order fields are written and the sync time stamped,
    /// * the order's affiliate commissions are cancelled.
    ///
    /// If the marker had already been claimed, the order fields are still written, but no money moves.
    async fn apply_cancellation(
        &self,
        order_id: i64,
        update: OrderSyncUpdate,
    ) -> Result<CancellationOutcome, FulfillmentError>;
}
