//! Opportunity repository trait.
//!
//! These are the generic store primitives the reconciliation engine depends
//! on. The trait is database-agnostic; storage-specific details are handled
//! by concrete implementations.

use async_trait::async_trait;

use super::opportunities_model::{
    OpportunityField, OpportunityMatches, OpportunityRecord, OpportunityUpdate,
};
use crate::errors::Result;

/// Trait defining the contract for opportunity store operations.
#[async_trait]
pub trait OpportunityRepositoryTrait: Send + Sync {
    /// Records whose column `field` equals `value`.
    async fn find_by_equality(
        &self,
        field: OpportunityField,
        value: &str,
    ) -> Result<OpportunityMatches>;

    /// Records whose embedded data holds `value` under the top-level `key`.
    async fn find_by_nested_key_equality(
        &self,
        key: &str,
        value: &str,
    ) -> Result<OpportunityMatches>;

    /// Applies `update` to a single record and returns the stored result.
    ///
    /// Implementations must apply it atomically per record using
    /// [`OpportunityRecord::apply_update`], so the reference guard and the
    /// shallow merge behave identically across stores.
    async fn update_by_id(
        &self,
        opportunity_id: &str,
        update: OpportunityUpdate,
    ) -> Result<OpportunityRecord>;
}
