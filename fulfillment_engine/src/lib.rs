//! Fulfillment Engine
//!
//! The fulfillment engine is the core of a reseller order panel. Users order services that are fulfilled by
//! third-party upstream providers. The engine forwards those orders to the providers, relays refill and cancel
//! requests, and periodically reconciles local order records with what the providers report, refunding upstream
//! cancellations exactly once.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`] and [`mod@traits`]). SQLite is the supported backend. You should
//!    never need to access the database directly. Instead, use the public API provided by the engine. The exception is
//!    the data types used in the database. These are defined in the `db_types` module and are public.
//! 2. The engine public API ([`mod@panel_api`]). This provides order forwarding and provider reconciliation. Backends
//!    need to implement the traits in [`mod@traits`] in order to act as a backend for the fulfillment server.
//!
//! Talking to providers is delegated to the `provider_tools` crate.
//!
//! The engine also provides a set of events that can be subscribed to. Sync runs that are asked to broadcast emit
//! progress events, and an event for every order whose state changed.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod panel_api;
pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use panel_api::{
    limiter::ProviderLimiter,
    order_flow_api::OrderFlowApi,
    provider_sync_api::ProviderSyncApi,
    sync_objects::{SyncConfig, SyncRequest, SyncRunResult, SyncScope, SyncTrigger},
};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use traits::{AuditLog, CancellationOutcome, FulfillmentDatabase, FulfillmentError, OrderManagement, SyncDatabase};
