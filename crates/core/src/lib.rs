//! Leadsync Core - lead/opportunity reconciliation engine.
//!
//! This crate contains the logic that keeps pipeline opportunity records
//! consistent with the master lead they were derived from. It is
//! database-agnostic and defines traits that are implemented by the
//! `storage-sqlite` crate.

pub mod constants;
pub mod errors;
pub mod events;
pub mod leads;
pub mod mapping;
pub mod opportunities;
pub mod reconcile;

// Re-export the service entry points
pub use reconcile::{ReconcileConfig, ReconciliationService, ReconciliationServiceTrait, SyncResult};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
