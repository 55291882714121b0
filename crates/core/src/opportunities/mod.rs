//! Opportunities module - pipeline opportunity models and the store port.

mod opportunities_model;
mod opportunities_traits;

pub use opportunities_model::{
    merge_embedded, EmbeddedData, NewOpportunity, OpportunityError, OpportunityField,
    OpportunityMatches, OpportunityRecord, OpportunityUpdate,
};
pub use opportunities_traits::OpportunityRepositoryTrait;
