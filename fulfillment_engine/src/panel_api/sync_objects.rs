use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::db_types::LogAction;

pub const DEFAULT_SYNC_TIME_BUDGET: Duration = Duration::from_secs(25);
pub const DEFAULT_MAX_CANDIDATES: usize = 200;
pub const DEFAULT_MAX_PER_RUN: usize = 100;

/// What triggered a sync run. Determines the audit action recorded for each attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncTrigger {
    #[default]
    Manual,
    Cron,
}

impl SyncTrigger {
    pub fn log_action(&self) -> LogAction {
        match self {
            SyncTrigger::Manual => LogAction::ManualSync,
            SyncTrigger::Cron => LogAction::CronSync,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SyncScope {
    /// Exactly these orders (as long as they have an upstream reference)
    Orders(Vec<i64>),
    /// Every eligible order, optionally only those of one provider
    All { provider_id: Option<i64> },
}

impl Default for SyncScope {
    fn default() -> Self {
        SyncScope::All { provider_id: None }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub scope: SyncScope,
    pub trigger: SyncTrigger,
    /// Emit progress and order-updated events
    pub broadcast: bool,
}

impl SyncRequest {
    pub fn all(trigger: SyncTrigger) -> Self {
        Self { scope: SyncScope::All { provider_id: None }, trigger, broadcast: false }
    }

    pub fn for_provider(provider_id: i64, trigger: SyncTrigger) -> Self {
        Self { scope: SyncScope::All { provider_id: Some(provider_id) }, trigger, broadcast: false }
    }

    pub fn for_orders(ids: &[i64], trigger: SyncTrigger) -> Self {
        Self { scope: SyncScope::Orders(ids.to_vec()), trigger, broadcast: false }
    }

    pub fn with_broadcast(mut self, broadcast: bool) -> Self {
        self.broadcast = broadcast;
        self
    }
}

/// Limits for a single sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Soft wall-clock deadline, checked before each provider bucket and each order
    pub time_budget: Duration,
    /// How many candidates "sync all" fetches
    pub max_candidates: usize,
    /// How many of those are processed
    pub max_per_run: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_SYNC_TIME_BUDGET,
            max_candidates: DEFAULT_MAX_CANDIDATES,
            max_per_run: DEFAULT_MAX_PER_RUN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRunResult {
    /// Orders matching the selection
    pub discovered: usize,
    /// Orders kept after the per-run cap
    pub selected: usize,
    /// Orders for which a status query was attempted
    pub processed: usize,
    /// Orders whose status was fetched and applied
    pub synced: usize,
    pub failed: usize,
    /// Orders left alone because their provider is missing or not active
    pub skipped: usize,
    pub timed_out: bool,
    pub updated_order_ids: Vec<i64>,
}
