//! In-memory stores shared by the reconciliation unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::errors::{DatabaseError, Error, Result};
use crate::leads::{fields, LeadRepositoryTrait, LeadSnapshot, MasterLead, RawPatch};
use crate::opportunities::{
    OpportunityError, OpportunityField, OpportunityMatches, OpportunityRecord,
    OpportunityRepositoryTrait, OpportunityUpdate,
};

pub fn opportunity(id: &str, lead_master_id: Option<&str>, embedded: Value) -> OpportunityRecord {
    let now = Utc::now().naive_utc();
    OpportunityRecord {
        id: id.to_string(),
        lead_master_id: lead_master_id.map(str::to_string),
        pipeline_id: "pipeline-1".to_string(),
        stage_id: "stage-1".to_string(),
        embedded_data: embedded.as_object().cloned().unwrap_or_default(),
        created_at: now,
        updated_at: now,
    }
}

pub fn lead(id: &str, first_name: &str, last_name: &str, email: &str) -> MasterLead {
    MasterLead {
        id: id.to_string(),
        first_name: Some(first_name.to_string()),
        last_name: Some(last_name.to_string()),
        email: Some(email.to_string()),
        ..Default::default()
    }
}

pub fn snapshot_with_email(email: &str) -> LeadSnapshot {
    let mut patch = RawPatch::new();
    patch.insert(fields::EMAIL.to_string(), email.to_string());
    LeadSnapshot::default().with_patch(&patch)
}

pub fn patch(pairs: &[(&str, &str)]) -> RawPatch {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[derive(Default)]
struct OpportunityState {
    records: Vec<OpportunityRecord>,
    fail_field_lookups: bool,
    fail_nested_lookups: bool,
    field_lookup_delay: Option<Duration>,
    failing_writes: HashSet<String>,
    unreadable: HashSet<String>,
    slow_writes: HashMap<String, Duration>,
    write_count: usize,
    nested_lookup_count: usize,
}

impl OpportunityState {
    fn matches(&self, predicate: impl Fn(&OpportunityRecord) -> bool) -> OpportunityMatches {
        let mut matches = OpportunityMatches::default();
        for record in self.records.iter().filter(|r| predicate(r)) {
            if self.unreadable.contains(&record.id) {
                matches.unreadable_ids.push(record.id.clone());
            } else {
                matches.records.push(record.clone());
            }
        }
        matches
    }
}

/// Opportunity store backed by a vector, with switchable failures.
#[derive(Clone, Default)]
pub struct InMemoryOpportunityStore {
    state: Arc<Mutex<OpportunityState>>,
}

impl InMemoryOpportunityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: OpportunityRecord) {
        self.state.lock().unwrap().records.push(record);
    }

    pub fn get(&self, id: &str) -> OpportunityRecord {
        self.state
            .lock()
            .unwrap()
            .records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .unwrap()
    }

    pub fn fail_field_lookups(&self) {
        self.state.lock().unwrap().fail_field_lookups = true;
    }

    pub fn fail_nested_lookups(&self) {
        self.state.lock().unwrap().fail_nested_lookups = true;
    }

    pub fn delay_field_lookups(&self, delay: Duration) {
        self.state.lock().unwrap().field_lookup_delay = Some(delay);
    }

    /// Reports the record as matched but undecodable in every lookup.
    pub fn mark_unreadable(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .unreadable
            .insert(id.to_string());
    }

    pub fn fail_writes_to(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_writes
            .insert(id.to_string());
    }

    pub fn slow_writes_to(&self, id: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .slow_writes
            .insert(id.to_string(), delay);
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().write_count
    }

    pub fn nested_lookup_count(&self) -> usize {
        self.state.lock().unwrap().nested_lookup_count
    }
}

#[async_trait]
impl OpportunityRepositoryTrait for InMemoryOpportunityStore {
    async fn find_by_equality(
        &self,
        field: OpportunityField,
        value: &str,
    ) -> Result<OpportunityMatches> {
        let (fail, delay) = {
            let state = self.state.lock().unwrap();
            (state.fail_field_lookups, state.field_lookup_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "simulated lookup failure".to_string(),
            )));
        }
        let state = self.state.lock().unwrap();
        Ok(state.matches(|r| r.field_value(field) == Some(value)))
    }

    async fn find_by_nested_key_equality(
        &self,
        key: &str,
        value: &str,
    ) -> Result<OpportunityMatches> {
        let mut state = self.state.lock().unwrap();
        state.nested_lookup_count += 1;
        if state.fail_nested_lookups {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "simulated lookup failure".to_string(),
            )));
        }
        Ok(state.matches(|r| r.embedded_str(key) == Some(value)))
    }

    async fn update_by_id(
        &self,
        opportunity_id: &str,
        update: OpportunityUpdate,
    ) -> Result<OpportunityRecord> {
        let delay = self
            .state
            .lock()
            .unwrap()
            .slow_writes
            .get(opportunity_id)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().unwrap();
        if state.failing_writes.contains(opportunity_id) {
            return Err(Error::Database(DatabaseError::QueryFailed(format!(
                "simulated write failure for {}",
                opportunity_id
            ))));
        }
        state.write_count += 1;
        let record = state
            .records
            .iter_mut()
            .find(|r| r.id == opportunity_id)
            .ok_or_else(|| OpportunityError::NotFound(opportunity_id.to_string()))?;
        record.apply_update(&update)?;
        Ok(record.clone())
    }
}

/// Lead store backed by a map.
#[derive(Clone, Default)]
pub struct InMemoryLeadStore {
    leads: Arc<Mutex<HashMap<String, MasterLead>>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, lead: MasterLead) {
        self.leads.lock().unwrap().insert(lead.id.clone(), lead);
    }
}

#[async_trait]
impl LeadRepositoryTrait for InMemoryLeadStore {
    async fn find_by_id(&self, lead_id: &str) -> Result<Option<MasterLead>> {
        Ok(self.leads.lock().unwrap().get(lead_id).cloned())
    }
}
