//! Finds the opportunity records that belong to a master lead.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};

use super::reconcile_model::SyncMethod;
use super::store_calls::bounded;
use crate::constants::EMBEDDED_LEGACY_LEAD_KEY;
use crate::errors::{Result, ValidationError};
use crate::leads::{fields, LeadSnapshot};
use crate::opportunities::{
    OpportunityField, OpportunityMatches, OpportunityRecord, OpportunityRepositoryTrait,
};

/// Reference-based resolution strategies, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTier {
    /// `lead_master_id` column equals the lead id.
    DirectReference,
    /// Legacy lead id key inside the embedded data equals the lead id.
    LegacyEmbedded,
}

impl ReferenceTier {
    pub fn next(self) -> Option<Self> {
        match self {
            ReferenceTier::DirectReference => Some(ReferenceTier::LegacyEmbedded),
            ReferenceTier::LegacyEmbedded => None,
        }
    }

    pub fn method(self) -> SyncMethod {
        match self {
            ReferenceTier::DirectReference => SyncMethod::DirectReference,
            ReferenceTier::LegacyEmbedded => SyncMethod::LegacyEmbedded,
        }
    }
}

/// Records found by the first tier that returned anything.
///
/// `tier` is `None` when every reference tier came back empty (or failed),
/// which is the signal to try orphan linking. `failed_tiers` tells an empty
/// store apart from one that could not be queried.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub tier: Option<ReferenceTier>,
    pub targets: Vec<OpportunityRecord>,
    /// Matched by `tier` but not decodable; they cannot be written.
    pub unreadable_ids: Vec<String>,
    pub failed_tiers: Vec<ReferenceTier>,
}

impl Resolution {
    pub fn method(&self) -> SyncMethod {
        self.tier.map(ReferenceTier::method).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty() && self.unreadable_ids.is_empty()
    }

    pub fn lookup_failed(&self) -> bool {
        !self.failed_tiers.is_empty()
    }
}

pub struct IdentityResolver {
    repository: Arc<dyn OpportunityRepositoryTrait>,
    lookup_timeout: Duration,
}

impl IdentityResolver {
    pub fn new(repository: Arc<dyn OpportunityRepositoryTrait>, lookup_timeout: Duration) -> Self {
        Self {
            repository,
            lookup_timeout,
        }
    }

    /// Resolves through every reference tier; the first non-empty tier wins.
    pub async fn resolve(&self, lead_id: &str, snapshot: &LeadSnapshot) -> Result<Resolution> {
        self.resolve_from(lead_id, snapshot, ReferenceTier::DirectReference)
            .await
    }

    /// Same as [`resolve`](Self::resolve) but starting at `start`.
    ///
    /// A tier whose lookup fails or times out is skipped, not retried.
    /// Only invalid input is returned as an error.
    pub async fn resolve_from(
        &self,
        lead_id: &str,
        snapshot: &LeadSnapshot,
        start: ReferenceTier,
    ) -> Result<Resolution> {
        if lead_id.trim().is_empty() {
            return Err(ValidationError::MissingField("lead_master_id".to_string()).into());
        }
        if snapshot.email().is_none() {
            return Err(ValidationError::MissingField(fields::EMAIL.to_string()).into());
        }

        let mut resolution = Resolution::default();
        let mut tier = Some(start);
        while let Some(current) = tier {
            match self.lookup(current, lead_id).await {
                Ok(matches) if !matches.is_empty() => {
                    resolution.targets = dedup_by_id(matches.records);
                    resolution.unreadable_ids = matches.unreadable_ids;
                    resolution.tier = Some(current);
                    debug!(
                        "Lead {} resolved to {} opportunities via {:?} ({} unreadable)",
                        lead_id,
                        resolution.targets.len(),
                        current,
                        resolution.unreadable_ids.len()
                    );
                    return Ok(resolution);
                }
                Ok(_) => debug!("No opportunities for lead {} via {:?}", lead_id, current),
                Err(e) => {
                    warn!(
                        "Lookup {:?} for lead {} failed, falling through: {}",
                        current, lead_id, e
                    );
                    resolution.failed_tiers.push(current);
                }
            }
            tier = current.next();
        }

        Ok(resolution)
    }

    async fn lookup(&self, tier: ReferenceTier, lead_id: &str) -> Result<OpportunityMatches> {
        match tier {
            ReferenceTier::DirectReference => {
                bounded(
                    "find_by_equality(lead_master_id)",
                    self.lookup_timeout,
                    self.repository
                        .find_by_equality(OpportunityField::LeadMasterId, lead_id),
                )
                .await
            }
            ReferenceTier::LegacyEmbedded => {
                let matches = bounded(
                    "find_by_nested_key_equality(lead_id)",
                    self.lookup_timeout,
                    self.repository
                        .find_by_nested_key_equality(EMBEDDED_LEGACY_LEAD_KEY, lead_id),
                )
                .await?;
                // A legacy key never overrides a relational link to another lead.
                let records = matches
                    .records
                    .into_iter()
                    .filter(|record| match record.lead_master_id.as_deref() {
                        None => true,
                        Some(linked) if linked == lead_id => true,
                        Some(linked) => {
                            warn!(
                                "Opportunity {} carries legacy key for {} but is linked to {}, skipping",
                                record.id, lead_id, linked
                            );
                            false
                        }
                    })
                    .collect();
                Ok(OpportunityMatches {
                    records,
                    unreadable_ids: matches.unreadable_ids,
                })
            }
        }
    }
}

pub(crate) fn dedup_by_id(records: Vec<OpportunityRecord>) -> Vec<OpportunityRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::reconcile::testing::{opportunity, snapshot_with_email, InMemoryOpportunityStore};
    use serde_json::json;

    fn resolver(store: &InMemoryOpportunityStore) -> IdentityResolver {
        IdentityResolver::new(Arc::new(store.clone()), Duration::from_millis(100))
    }

    #[tokio::test]
    async fn test_direct_reference_wins_over_legacy() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", Some("L1"), json!({"nome": "Ana"})));
        store.insert(opportunity("O2", None, json!({"lead_id": "L1"})));

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert_eq!(resolution.method(), SyncMethod::DirectReference);
        let ids: Vec<&str> = resolution.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["O1"]);
    }

    #[tokio::test]
    async fn test_legacy_embedded_used_when_no_direct_reference() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O2", None, json!({"lead_id": "L1"})));
        store.insert(opportunity("O3", Some("L9"), json!({"lead_id": "L1"})));

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert_eq!(resolution.method(), SyncMethod::LegacyEmbedded);
        let ids: Vec<&str> = resolution.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["O2"]);
    }

    #[tokio::test]
    async fn test_failed_tier_falls_through() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", Some("L1"), json!({"lead_id": "L1"})));
        store.fail_field_lookups();

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert_eq!(resolution.method(), SyncMethod::LegacyEmbedded);
        assert_eq!(resolution.targets.len(), 1);
    }

    #[tokio::test]
    async fn test_timed_out_tier_falls_through() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", Some("L1"), json!({"lead_id": "L1"})));
        store.delay_field_lookups(Duration::from_millis(500));

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert_eq!(resolution.method(), SyncMethod::LegacyEmbedded);
    }

    #[tokio::test]
    async fn test_empty_when_nothing_references_lead() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", None, json!({"email": "ana@x.com"})));

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert!(resolution.is_empty());
        assert_eq!(resolution.method(), SyncMethod::None);
        assert!(!resolution.lookup_failed());
    }

    #[tokio::test]
    async fn test_records_every_failed_tier() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", Some("L1"), json!({"lead_id": "L1"})));
        store.fail_field_lookups();
        store.fail_nested_lookups();

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert!(resolution.is_empty());
        assert!(resolution.lookup_failed());
        assert_eq!(
            resolution.failed_tiers,
            vec![ReferenceTier::DirectReference, ReferenceTier::LegacyEmbedded]
        );
    }

    #[tokio::test]
    async fn test_unreadable_rows_are_reported_with_their_tier() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O1", Some("L1"), json!({})));
        store.insert(opportunity("O2", Some("L1"), json!({})));
        store.mark_unreadable("O1");

        let resolution = resolver(&store)
            .resolve("L1", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap();

        assert_eq!(resolution.method(), SyncMethod::DirectReference);
        assert_eq!(resolution.unreadable_ids, vec!["O1"]);
        let ids: Vec<&str> = resolution.targets.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["O2"]);
    }

    #[tokio::test]
    async fn test_rejects_missing_inputs() {
        let store = InMemoryOpportunityStore::new();

        let err = resolver(&store)
            .resolve(" ", &snapshot_with_email("ana@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingField(_))));

        let err = resolver(&store)
            .resolve("L1", &LeadSnapshot::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingField(_))));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let records = vec![
            opportunity("O1", Some("L1"), json!({"n": 1})),
            opportunity("O2", Some("L1"), json!({})),
            opportunity("O1", Some("L1"), json!({"n": 2})),
        ];
        let deduped = dedup_by_id(records);
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].embedded_data.get("n"), Some(&json!(1)));
    }
}
