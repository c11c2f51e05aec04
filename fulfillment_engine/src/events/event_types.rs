use serde::{Deserialize, Serialize};

use crate::db_types::OrderDetails;

/// Emitted after every order a broadcast sync run processes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncProgressEvent {
    /// The number of orders selected for the run
    pub total: usize,
    pub processed: usize,
    pub synced: usize,
    pub current_order_id: i64,
}

/// Emitted at the end of a broadcast sync run for every order whose state changed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdatedEvent {
    pub details: OrderDetails,
}

impl OrderUpdatedEvent {
    pub fn new(details: OrderDetails) -> Self {
        Self { details }
    }
}
