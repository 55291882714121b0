//! SQLite storage implementation for the lead reconciliation engine.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `leadsync-core` and contains:
//! - Database connection pooling and management
//! - Diesel migrations for the `leads` and `opportunities` tables
//! - Repository implementations for leads and opportunities
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place where Diesel dependencies exist. The core
//! crate is database-agnostic and works with traits.
//!
//! ```text
//!     core (reconciliation)
//!              │
//!              ▼
//!   storage-sqlite (this crate)
//!              │
//!              ▼
//!          SQLite DB
//! ```
//!
//! All writes go through a single writer actor ([`WriteHandle`]), so the
//! read-merge-write of an opportunity update is atomic per record.

pub mod db;
pub mod errors;
pub mod schema;
pub mod utils;

// Repository implementations
pub mod leads;
pub mod opportunities;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, get_db_path, init, open, run_migrations, spawn_writer,
    DbConnection, DbPool, WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::{IntoCore, StorageError};

pub use leads::LeadRepository;
pub use opportunities::OpportunityRepository;

// Re-export from leadsync-core for convenience
pub use leadsync_core::errors::{DatabaseError, Error, Result};
