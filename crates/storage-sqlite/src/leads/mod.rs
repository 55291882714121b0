//! SQLite storage implementation for master leads.

mod model;
mod repository;

pub use model::LeadDB;
pub use repository::LeadRepository;
