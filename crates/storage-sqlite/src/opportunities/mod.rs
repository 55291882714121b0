//! SQLite storage implementation for opportunities.

mod model;
mod repository;

pub use model::OpportunityDB;
pub use repository::OpportunityRepository;
