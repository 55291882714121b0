//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::leads::RawPatch;
use crate::opportunities::EmbeddedData;
use crate::reconcile::SyncMethod;

/// Domain events emitted by the reconciliation engine.
///
/// These events represent facts about propagated lead edits. Runtime adapters
/// translate them into platform-specific actions (cache invalidation,
/// dashboard refresh, etc.).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A lead edit was propagated (or attempted) to its opportunities.
    LeadOpportunitiesSynced(OpportunitySyncEvent),
}

/// Payload describing one propagated lead edit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunitySyncEvent {
    pub lead_master_id: String,
    pub raw_patch: RawPatch,
    pub mapped_patch: EmbeddedData,
    pub affected_opportunity_ids: Vec<String>,
    pub method: SyncMethod,
}

impl DomainEvent {
    /// Creates a LeadOpportunitiesSynced event.
    pub fn lead_opportunities_synced(
        lead_master_id: String,
        raw_patch: RawPatch,
        mapped_patch: EmbeddedData,
        affected_opportunity_ids: Vec<String>,
        method: SyncMethod,
    ) -> Self {
        Self::LeadOpportunitiesSynced(OpportunitySyncEvent {
            lead_master_id,
            raw_patch,
            mapped_patch,
            affected_opportunity_ids,
            method,
        })
    }
}
