use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, error, info, warn};

use super::change_notifier::ChangeNotifier;
use super::identity_resolver::{IdentityResolver, ReferenceTier};
use super::orphan_linker::OrphanLinker;
use super::reconcile_config::ReconcileConfig;
use super::reconcile_model::{LeadEdit, SyncMethod, SyncResult, SyncStatus, WriteTally};
use super::reconcile_traits::ReconciliationServiceTrait;
use super::store_calls::{bounded, write_all};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEventSink, NoOpDomainEventSink};
use crate::leads::{fields, LeadRepositoryTrait, LeadSnapshot, MasterLead, RawPatch};
use crate::mapping::{validate_patch, FieldMapper};
use crate::opportunities::{EmbeddedData, OpportunityRepositoryTrait, OpportunityUpdate};

/// Keeps opportunity embedded data consistent with master lead edits.
///
/// Holds no state between calls: every sync re-reads the lead and
/// re-resolves its opportunities.
pub struct ReconciliationService {
    lead_repository: Arc<dyn LeadRepositoryTrait>,
    opportunity_repository: Arc<dyn OpportunityRepositoryTrait>,
    resolver: IdentityResolver,
    linker: OrphanLinker,
    mapper: FieldMapper,
    notifier: ChangeNotifier,
    config: ReconcileConfig,
}

impl ReconciliationService {
    pub fn new(
        lead_repository: Arc<dyn LeadRepositoryTrait>,
        opportunity_repository: Arc<dyn OpportunityRepositoryTrait>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            resolver: IdentityResolver::new(
                Arc::clone(&opportunity_repository),
                config.lookup_timeout(),
            ),
            linker: OrphanLinker::new(
                Arc::clone(&opportunity_repository),
                config.lookup_timeout(),
                config.write_timeout(),
            ),
            lead_repository,
            opportunity_repository,
            mapper: FieldMapper::new(),
            notifier: ChangeNotifier::new(Arc::new(NoOpDomainEventSink)),
            config,
        }
    }

    /// Sets the domain event sink for emitting sync events.
    pub fn with_event_sink(mut self, event_sink: Arc<dyn DomainEventSink>) -> Self {
        self.notifier = ChangeNotifier::new(event_sink);
        self
    }

    /// Validates and maps `raw_patch`, then writes it to every opportunity of
    /// the lead.
    pub async fn sync(&self, lead_master_id: &str, raw_patch: RawPatch) -> Result<SyncResult> {
        let lead_master_id = lead_master_id.trim();
        if lead_master_id.is_empty() {
            return Err(ValidationError::MissingField("lead_master_id".to_string()).into());
        }
        validate_patch(&raw_patch)?;

        let lead = self.load_lead(lead_master_id).await?;
        let snapshot = lead.snapshot().with_patch(&raw_patch);
        let mapped_patch = self.mapper.map_patch(&raw_patch, &snapshot);

        self.propagate(lead_master_id, &snapshot, &raw_patch, mapped_patch)
            .await
    }

    async fn load_lead(&self, lead_master_id: &str) -> Result<MasterLead> {
        bounded(
            "find_lead_by_id",
            self.config.lookup_timeout(),
            self.lead_repository.find_by_id(lead_master_id),
        )
        .await?
        .ok_or_else(|| Error::LeadNotFound(lead_master_id.to_string()))
    }

    async fn propagate(
        &self,
        lead_master_id: &str,
        snapshot: &LeadSnapshot,
        raw_patch: &RawPatch,
        mapped_patch: EmbeddedData,
    ) -> Result<SyncResult> {
        let mut tally = WriteTally::default();
        let mut method = SyncMethod::None;
        let mut found_targets = false;
        let mut lookup_failed = false;

        let mut next = Some(ReferenceTier::DirectReference);
        while let Some(start) = next {
            let resolution = self
                .resolver
                .resolve_from(lead_master_id, snapshot, start)
                .await?;
            lookup_failed |= resolution.lookup_failed();
            let Some(tier) = resolution.tier else {
                break;
            };
            found_targets = true;
            method = tier.method();

            let updates = resolution
                .targets
                .into_iter()
                .map(|target| (target.id, OpportunityUpdate::merge(mapped_patch.clone())))
                .collect();
            let mut outcome = write_all(
                &self.opportunity_repository,
                updates,
                self.config.write_timeout(),
            )
            .await;
            for unreadable in resolution.unreadable_ids {
                warn!(
                    "Opportunity {} of lead {} is unreadable, counting it as failed",
                    unreadable, lead_master_id
                );
                outcome.record_failed(unreadable);
            }
            let any_written = !outcome.updated.is_empty();
            tally.absorb(outcome);
            if any_written {
                break;
            }

            warn!(
                "No write succeeded for lead {} via {:?}, re-resolving with the next tier",
                lead_master_id, tier
            );
            next = tier.next();
        }

        if !found_targets {
            debug!(
                "No referenced opportunities for lead {}, trying orphan linking",
                lead_master_id
            );
            let outcome = self
                .linker
                .find_and_link_orphans(lead_master_id, snapshot, &mapped_patch)
                .await;
            if !outcome.is_empty() {
                method = SyncMethod::OrphanLink;
            }
            lookup_failed |= outcome.lookup_failed;
            tally.absorb(WriteTally {
                updated: outcome.linked_ids,
                failed: outcome.failed_ids,
            });
        }

        let result = SyncResult {
            lead_master_id: lead_master_id.to_string(),
            updated_ids: tally.updated,
            failed_ids: tally.failed,
            method_used: method,
            mapped_patch,
            mapping_version: self.mapper.version(),
            lookup_failed,
        };

        match result.failure() {
            Some(failure) => warn!("{}", failure),
            None if result.status() == SyncStatus::NoTargets => {
                debug!("Lead {} has no opportunities to sync", lead_master_id)
            }
            None => info!(
                "Synced lead {} to {} opportunities via {:?}",
                lead_master_id,
                result.updated_ids.len(),
                result.method_used
            ),
        }

        self.notifier.publish(
            lead_master_id,
            raw_patch,
            &result.mapped_patch,
            &result.updated_ids,
            result.method_used,
        );

        Ok(result)
    }
}

#[async_trait]
impl ReconciliationServiceTrait for ReconciliationService {
    async fn on_lead_fields_edited(
        &self,
        lead_master_id: &str,
        patch: RawPatch,
    ) -> Result<SyncResult> {
        debug!(
            "Lead {} edited: {:?}",
            lead_master_id,
            patch.keys().collect::<Vec<_>>()
        );
        self.sync(lead_master_id, patch).await
    }

    async fn resync_lead(&self, lead_master_id: &str) -> Result<SyncResult> {
        let lead_master_id = lead_master_id.trim();
        if lead_master_id.is_empty() {
            return Err(ValidationError::MissingField("lead_master_id".to_string()).into());
        }

        let lead = self.load_lead(lead_master_id).await?;
        let snapshot = lead.snapshot();
        let raw_patch: RawPatch = snapshot
            .iter()
            .filter(|(key, _)| key.as_str() != fields::ID)
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let mapped_patch = self.mapper.project_lead(&snapshot);

        self.propagate(lead_master_id, &snapshot, &raw_patch, mapped_patch)
            .await
    }

    async fn sync_batch(&self, edits: Vec<LeadEdit>) -> Vec<(String, Result<SyncResult>)> {
        let mut results = Vec::with_capacity(edits.len());
        for edit in edits {
            let result = self.sync(&edit.lead_master_id, edit.patch).await;
            if let Err(e) = &result {
                if e.is_hard_failure() {
                    warn!("Skipping lead {} in batch: {}", edit.lead_master_id, e);
                } else {
                    error!("Lead {} failed in batch: {}", edit.lead_master_id, e);
                }
            }
            results.push((edit.lead_master_id, result));
        }
        results
    }
}
