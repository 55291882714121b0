//! Reconciliation result models.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::leads::RawPatch;
use crate::opportunities::EmbeddedData;

/// Which resolution tier produced the records that were written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SyncMethod {
    /// Matched on the relational `lead_master_id` reference.
    DirectReference,
    /// Matched on the lead id stored inside the embedded data.
    LegacyEmbedded,
    /// Matched orphans by email / name and linked them.
    OrphanLink,
    /// No tier produced any record.
    #[default]
    None,
}

/// Overall outcome of a sync, derived from the per-record results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    /// Every attempted record was written.
    Synced,
    /// Some records were written, some failed.
    Partial,
    /// Nothing was written: every found record failed, or a lookup failed
    /// before any record was found.
    Failed,
    /// Every tier was queried and none found a record to write.
    NoTargets,
}

/// Soft failures of the opportunity fan-out.
///
/// These are never raised by the engine; they are derived from a
/// [`SyncResult`] so callers can log or alert on them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncFailure {
    #[error("{} of {} opportunities of lead {lead_master_id} failed to sync", .failed_ids.len(), .failed_ids.len() + .updated_count)]
    Partial {
        lead_master_id: String,
        failed_ids: Vec<String>,
        updated_count: usize,
    },

    #[error("no opportunity of lead {lead_master_id} could be synced ({} failed), propagation pending", .failed_ids.len())]
    Total {
        lead_master_id: String,
        failed_ids: Vec<String>,
    },
}

/// Aggregate result of propagating one lead edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub lead_master_id: String,
    pub updated_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    pub method_used: SyncMethod,
    pub mapped_patch: EmbeddedData,
    pub mapping_version: u32,
    /// A store lookup failed or timed out during resolution.
    #[serde(default)]
    pub lookup_failed: bool,
}

impl SyncResult {
    pub fn status(&self) -> SyncStatus {
        match (self.updated_ids.is_empty(), self.failed_ids.is_empty()) {
            (false, true) => SyncStatus::Synced,
            (false, false) => SyncStatus::Partial,
            (true, false) => SyncStatus::Failed,
            (true, true) if self.lookup_failed => SyncStatus::Failed,
            (true, true) => SyncStatus::NoTargets,
        }
    }

    pub fn failure(&self) -> Option<SyncFailure> {
        match self.status() {
            SyncStatus::Partial => Some(SyncFailure::Partial {
                lead_master_id: self.lead_master_id.clone(),
                failed_ids: self.failed_ids.clone(),
                updated_count: self.updated_ids.len(),
            }),
            SyncStatus::Failed => Some(SyncFailure::Total {
                lead_master_id: self.lead_master_id.clone(),
                failed_ids: self.failed_ids.clone(),
            }),
            SyncStatus::Synced | SyncStatus::NoTargets => None,
        }
    }
}

/// One edit in a bulk operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadEdit {
    pub lead_master_id: String,
    pub patch: RawPatch,
}

/// Running tally of per-record outcomes across tiers.
///
/// A record that failed under one tier and was written under a later one
/// counts as updated only.
#[derive(Debug, Default)]
pub(crate) struct WriteTally {
    pub updated: Vec<String>,
    pub failed: Vec<String>,
}

impl WriteTally {
    pub fn record_updated(&mut self, id: String) {
        self.failed.retain(|failed| failed != &id);
        if !self.updated.contains(&id) {
            self.updated.push(id);
        }
    }

    pub fn record_failed(&mut self, id: String) {
        if !self.updated.contains(&id) && !self.failed.contains(&id) {
            self.failed.push(id);
        }
    }

    pub fn absorb(&mut self, other: WriteTally) {
        for id in other.updated {
            self.record_updated(id);
        }
        for id in other.failed {
            self.record_failed(id);
        }
    }
}
