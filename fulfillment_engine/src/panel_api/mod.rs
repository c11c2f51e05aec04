//! # Fulfillment panel public API
//!
//! The `panel_api` module exposes the programmatic API for forwarding orders to upstream providers and reconciling
//! their state afterwards.
//!
//! * [`order_flow_api`] places orders and forwards them, re-forwards orders whose forward failed, and handles refill
//!   and cancel requests.
//! * [`provider_sync_api`] pulls the upstream status of forwarded orders, writes changes back and refunds upstream
//!   cancellations exactly once.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API requires,
//! and a [`ForwardingFacade`](provider_tools::ForwardingFacade) wrapping the HTTP transport.
//!
//! ```rust,ignore
//! use fulfillment_engine::{ProviderSyncApi, SqliteDatabase, SyncRequest, SyncTrigger};
//! use provider_tools::{ForwardingFacade, ReqwestTransport};
//! let db = SqliteDatabase::new_with_url(...).await?;
//! let facade = ForwardingFacade::new(ReqwestTransport::new()?);
//! let api = ProviderSyncApi::new(db, facade);
//! let result = api.run_provider_sync(SyncRequest::all(SyncTrigger::Manual)).await?;
//! ```
pub mod limiter;
pub mod order_flow_api;
pub mod provider_sync_api;
pub mod sync_objects;

use crate::{db_types::LogStatus, traits::FulfillmentError};

/// The audit status for a failed provider interaction. An explicit rejection by the provider is an `error`; anything
/// else (transport trouble, unreadable replies, local failures) is `failed`.
pub(crate) fn audit_status(e: &FulfillmentError) -> LogStatus {
    match e {
        FulfillmentError::ProviderError(pe) if pe.is_rejection() => LogStatus::Error,
        _ => LogStatus::Failed,
    }
}

#[cfg(test)]
mod test {
    use provider_tools::ProviderApiError;

    use super::*;

    #[test]
    fn rejections_are_errors() {
        let rejected = ProviderApiError::Rejected { message: "Incorrect order ID".into(), body: "{}".into() };
        assert_eq!(audit_status(&rejected.into()), LogStatus::Error);
        let timeout = ProviderApiError::Timeout { seconds: 30 };
        assert_eq!(audit_status(&timeout.into()), LogStatus::Failed);
        assert_eq!(audit_status(&FulfillmentError::OrderNotFound(1)), LogStatus::Failed);
    }
}
