//! # Fulfillment panel server
//! This crate hosts the server for the fulfillment panel. It is responsible for:
//! * Running the scheduled provider sync, which keeps local orders in step with their upstream providers.
//! * Exposing an admin endpoint for triggering a sync on demand.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/sync`: Runs a provider sync and returns its totals. Requires the `panel_admin_token` header.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod sync_worker;

#[cfg(test)]
mod endpoint_tests;
