//! Lead repository trait.
//!
//! Leads are owned by lead management; the reconciliation engine only reads
//! them to build a complete snapshot before mapping an edit.

use async_trait::async_trait;

use super::leads_model::MasterLead;
use crate::errors::Result;

/// Read access to master leads.
#[async_trait]
pub trait LeadRepositoryTrait: Send + Sync {
    /// Retrieves a lead by its ID, `None` when no such lead exists.
    async fn find_by_id(&self, lead_id: &str) -> Result<Option<MasterLead>>;
}
