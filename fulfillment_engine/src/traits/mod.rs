//! # Database backend contracts
//!
//! The engine never talks to a database directly. Backends implement these traits, and the public APIs in
//! [`crate::panel_api`] are generic over them.
//!
//! * [`OrderManagement`] provides read access to orders, users, services, providers and their bookkeeping records.
//! * [`AuditLog`] appends entries to the provider audit trail.
//! * [`FulfillmentDatabase`] provides the atomic state changes behind order placement and refill/cancel requests.
//! * [`SyncDatabase`] provides candidate selection and the atomic state changes that reconciliation needs, including
//!   the refund path.
mod data_objects;
mod errors;
mod fulfillment_database;
mod order_management;
mod sync_database;

pub use data_objects::CancellationOutcome;
pub use errors::FulfillmentError;
pub use fulfillment_database::FulfillmentDatabase;
pub use order_management::{AuditLog, OrderManagement};
pub use sync_database::SyncDatabase;
