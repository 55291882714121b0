//! Service trait exposed to lead edit paths.

use async_trait::async_trait;

use super::reconcile_model::{LeadEdit, SyncResult};
use crate::errors::Result;
use crate::leads::RawPatch;

/// Entry points used by the UI and bulk tooling to propagate lead edits.
///
/// Validation and unknown-lead errors are returned as `Err`. Fan-out
/// problems (some or all opportunity writes failing) are reported inside the
/// returned [`SyncResult`].
#[async_trait]
pub trait ReconciliationServiceTrait: Send + Sync {
    /// Propagates fields edited on a lead to its opportunities.
    async fn on_lead_fields_edited(
        &self,
        lead_master_id: &str,
        patch: RawPatch,
    ) -> Result<SyncResult>;

    /// Pushes every mapped field of the stored lead, for retrying a lead
    /// whose earlier propagation did not complete.
    async fn resync_lead(&self, lead_master_id: &str) -> Result<SyncResult>;

    /// Propagates a batch of edits one lead after another. Each entry gets
    /// its own result; one failing lead does not stop the rest.
    async fn sync_batch(&self, edits: Vec<LeadEdit>) -> Vec<(String, Result<SyncResult>)>;
}
