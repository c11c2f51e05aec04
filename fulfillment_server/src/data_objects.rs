use fulfillment_engine::{SyncRequest, SyncTrigger};
use serde::{Deserialize, Serialize};

/// Body of a manual sync request. Every field is optional, and `{}` syncs every eligible order.
///
/// If `order_ids` is non-empty, exactly those orders are synced and `provider_id` is ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualSyncParams {
    #[serde(default)]
    pub order_ids: Vec<i64>,
    #[serde(default)]
    pub provider_id: Option<i64>,
    #[serde(default)]
    pub broadcast: bool,
}

impl ManualSyncParams {
    pub fn into_sync_request(self) -> SyncRequest {
        let request = match (self.order_ids.is_empty(), self.provider_id) {
            (false, _) => SyncRequest::for_orders(&self.order_ids, SyncTrigger::Manual),
            (true, Some(provider_id)) => SyncRequest::for_provider(provider_id, SyncTrigger::Manual),
            (true, None) => SyncRequest::all(SyncTrigger::Manual),
        };
        request.with_broadcast(self.broadcast)
    }
}
