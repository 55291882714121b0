//! Recovers opportunities that were never linked to their lead.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use super::identity_resolver::dedup_by_id;
use super::store_calls::{bounded, write_all};
use crate::constants::{EMBEDDED_DISPLAY_NAME_KEY, EMBEDDED_EMAIL_KEY};
use crate::errors::Result;
use crate::leads::LeadSnapshot;
use crate::opportunities::{
    EmbeddedData, OpportunityRecord, OpportunityRepositoryTrait, OpportunityUpdate,
};

/// Per-record outcome of an orphan linking pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrphanLinkOutcome {
    pub linked_ids: Vec<String>,
    pub failed_ids: Vec<String>,
    /// The orphan lookup itself failed, so orphans may exist unseen.
    pub lookup_failed: bool,
}

impl OrphanLinkOutcome {
    pub fn is_empty(&self) -> bool {
        self.linked_ids.is_empty() && self.failed_ids.is_empty()
    }
}

pub struct OrphanLinker {
    repository: Arc<dyn OpportunityRepositoryTrait>,
    lookup_timeout: Duration,
    write_timeout: Duration,
}

impl OrphanLinker {
    pub fn new(
        repository: Arc<dyn OpportunityRepositoryTrait>,
        lookup_timeout: Duration,
        write_timeout: Duration,
    ) -> Self {
        Self {
            repository,
            lookup_timeout,
            write_timeout,
        }
    }

    /// Unlinked records matching the lead by email, or by display name and
    /// email together. Records that already reference any lead are never
    /// returned.
    ///
    /// Both criteria require the email, so one email lookup serves both; the
    /// display name only labels which criterion a record met.
    pub async fn find_orphans(&self, snapshot: &LeadSnapshot) -> Result<Vec<OpportunityRecord>> {
        let Some(email) = snapshot.email() else {
            return Ok(Vec::new());
        };

        let matches = bounded(
            "find_by_nested_key_equality(email)",
            self.lookup_timeout,
            self.repository
                .find_by_nested_key_equality(EMBEDDED_EMAIL_KEY, email),
        )
        .await?;
        if !matches.unreadable_ids.is_empty() {
            warn!(
                "Skipping unreadable orphan candidates for {}: {:?}",
                email, matches.unreadable_ids
            );
        }

        let full_name = snapshot.full_name();
        let orphans: Vec<OpportunityRecord> = dedup_by_id(matches.records)
            .into_iter()
            .filter(OpportunityRecord::is_orphan)
            .collect();
        for orphan in &orphans {
            let by_name = full_name.is_some()
                && orphan.embedded_str(EMBEDDED_DISPLAY_NAME_KEY) == full_name.as_deref();
            debug!(
                "Orphan {} matches by {}",
                orphan.id,
                if by_name { "name and email" } else { "email" }
            );
        }
        Ok(orphans)
    }

    /// Links every orphan found for the lead and merges `mapped_patch` into
    /// it, both in one write per record.
    ///
    /// Running it again is a no-op: linked records no longer qualify.
    pub async fn find_and_link_orphans(
        &self,
        lead_id: &str,
        snapshot: &LeadSnapshot,
        mapped_patch: &EmbeddedData,
    ) -> OrphanLinkOutcome {
        let orphans = match self.find_orphans(snapshot).await {
            Ok(orphans) => orphans,
            Err(e) => {
                warn!("Orphan lookup for lead {} failed: {}", lead_id, e);
                return OrphanLinkOutcome {
                    lookup_failed: true,
                    ..Default::default()
                };
            }
        };
        if orphans.is_empty() {
            return OrphanLinkOutcome::default();
        }

        let updates = orphans
            .into_iter()
            .map(|orphan| {
                (
                    orphan.id,
                    OpportunityUpdate::link_and_merge(lead_id, mapped_patch.clone()),
                )
            })
            .collect();

        let tally = write_all(&self.repository, updates, self.write_timeout).await;
        if !tally.updated.is_empty() {
            info!(
                "Linked {} orphan opportunities to lead {}: {:?}",
                tally.updated.len(),
                lead_id,
                tally.updated
            );
        }

        OrphanLinkOutcome {
            linked_ids: tally.updated,
            failed_ids: tally.failed,
            lookup_failed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::testing::{lead, opportunity, InMemoryOpportunityStore};
    use serde_json::json;

    fn linker(store: &InMemoryOpportunityStore) -> OrphanLinker {
        OrphanLinker::new(
            Arc::new(store.clone()),
            Duration::from_millis(100),
            Duration::from_millis(100),
        )
    }

    fn mapped() -> EmbeddedData {
        json!({"status": "qualified"}).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_links_by_email_and_merges_patch() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O2", None, json!({"email": "ana@x.com", "extra": 1})));
        let snapshot = lead("L1", "Ana", "Silva", "ana@x.com").snapshot();

        let outcome = linker(&store)
            .find_and_link_orphans("L1", &snapshot, &mapped())
            .await;

        assert_eq!(outcome.linked_ids, vec!["O2"]);
        let o2 = store.get("O2");
        assert_eq!(o2.lead_master_id.as_deref(), Some("L1"));
        assert_eq!(o2.embedded_data.get("status"), Some(&json!("qualified")));
        assert_eq!(o2.embedded_data.get("extra"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_never_captures_linked_records() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O2", Some("L1"), json!({"email": "ana@x.com"})));
        let snapshot = lead("L2", "Ana", "Other", "ana@x.com").snapshot();

        let outcome = linker(&store)
            .find_and_link_orphans("L2", &snapshot, &mapped())
            .await;

        assert!(outcome.is_empty());
        assert_eq!(store.get("O2").lead_master_id.as_deref(), Some("L1"));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_name_match_requires_email_too() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O3", None, json!({"nome": "Ana Silva", "email": "ana@x.com"})));
        store.insert(opportunity("O4", None, json!({"nome": "Ana Silva", "email": "other@x.com"})));
        let snapshot = lead("L1", "Ana", "Silva", "ana@x.com").snapshot();

        let orphans = linker(&store).find_orphans(&snapshot).await.unwrap();

        let ids: Vec<&str> = orphans.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, vec!["O3"]);
    }

    #[tokio::test]
    async fn test_name_and_email_share_one_lookup() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O3", None, json!({"nome": "Ana Silva", "email": "ana@x.com"})));
        store.insert(opportunity("O5", None, json!({"nome": "Someone", "email": "ana@x.com"})));
        let snapshot = lead("L1", "Ana", "Silva", "ana@x.com").snapshot();

        let orphans = linker(&store).find_orphans(&snapshot).await.unwrap();

        assert_eq!(orphans.len(), 2);
        assert_eq!(store.nested_lookup_count(), 1);
    }

    #[tokio::test]
    async fn test_second_pass_is_noop() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O2", None, json!({"email": "ana@x.com"})));
        let snapshot = lead("L1", "Ana", "Silva", "ana@x.com").snapshot();
        let linker = linker(&store);

        linker.find_and_link_orphans("L1", &snapshot, &mapped()).await;
        let second = linker.find_and_link_orphans("L1", &snapshot, &mapped()).await;

        assert!(second.is_empty());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_failure_yields_nothing() {
        let store = InMemoryOpportunityStore::new();
        store.insert(opportunity("O2", None, json!({"email": "ana@x.com"})));
        store.fail_nested_lookups();
        let snapshot = lead("L1", "Ana", "Silva", "ana@x.com").snapshot();

        let outcome = linker(&store)
            .find_and_link_orphans("L1", &snapshot, &mapped())
            .await;

        assert!(outcome.is_empty());
        assert!(outcome.lookup_failed);
        assert!(store.get("O2").is_orphan());
    }
}
