//! Request and response payloads for the HTTP boundary and the dispatched
//! task/stats payloads.

/// Game-level requests and summaries.
pub mod game;
/// Health probe response.
pub mod health;
/// Bulk import payloads.
pub mod import;
/// Point-level requests and snapshots.
pub mod point;
/// Payloads handed to the statistics dispatcher.
pub mod stats;
