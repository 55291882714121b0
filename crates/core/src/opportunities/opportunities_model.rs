//! Opportunity record domain models.

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Schema-less display data duplicated from the lead onto the opportunity.
pub type EmbeddedData = Map<String, Value>;

/// Errors specific to opportunity records.
#[derive(Error, Debug)]
pub enum OpportunityError {
    #[error("Opportunity '{0}' not found")]
    NotFound(String),

    #[error("Opportunity '{opportunity_id}' is linked to lead '{linked_to}', refusing to link it to '{requested}'")]
    AlreadyLinked {
        opportunity_id: String,
        linked_to: String,
        requested: String,
    },
}

/// Columns that can be matched with plain equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpportunityField {
    Id,
    LeadMasterId,
    PipelineId,
    StageId,
}

impl OpportunityField {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityField::Id => "id",
            OpportunityField::LeadMasterId => "lead_master_id",
            OpportunityField::PipelineId => "pipeline_id",
            OpportunityField::StageId => "stage_id",
        }
    }
}

/// Pipeline-stage-scoped opportunity derived from a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityRecord {
    pub id: String,
    /// Relational reference to the master lead; `None` for orphans.
    pub lead_master_id: Option<String>,
    pub pipeline_id: String,
    pub stage_id: String,
    pub embedded_data: EmbeddedData,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl OpportunityRecord {
    pub fn is_orphan(&self) -> bool {
        self.lead_master_id.is_none()
    }

    /// String value stored under an embedded key.
    pub fn embedded_str(&self, key: &str) -> Option<&str> {
        self.embedded_data.get(key).and_then(Value::as_str)
    }

    /// Field value for an equality lookup. `None` means SQL NULL.
    pub fn field_value(&self, field: OpportunityField) -> Option<&str> {
        match field {
            OpportunityField::Id => Some(&self.id),
            OpportunityField::LeadMasterId => self.lead_master_id.as_deref(),
            OpportunityField::PipelineId => Some(&self.pipeline_id),
            OpportunityField::StageId => Some(&self.stage_id),
        }
    }

    /// Applies an update in place: links the record if requested, then
    /// shallow-merges the embedded patch.
    ///
    /// A reference is only ever set from `None`. Asking to link a record that
    /// already points at another lead fails without touching it.
    pub fn apply_update(&mut self, update: &OpportunityUpdate) -> Result<(), OpportunityError> {
        if let Some(requested) = &update.link_lead_master_id {
            match &self.lead_master_id {
                Some(linked_to) if linked_to != requested => {
                    return Err(OpportunityError::AlreadyLinked {
                        opportunity_id: self.id.clone(),
                        linked_to: linked_to.clone(),
                        requested: requested.clone(),
                    });
                }
                Some(_) => {}
                None => self.lead_master_id = Some(requested.clone()),
            }
        }

        merge_embedded(&mut self.embedded_data, &update.embedded_patch);
        self.updated_at = Utc::now().naive_utc();
        Ok(())
    }
}

/// Shallow merge: keys in `patch` overwrite, every other key is kept.
pub fn merge_embedded(target: &mut EmbeddedData, patch: &EmbeddedData) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}

/// Write applied to a single opportunity record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpportunityUpdate {
    /// Lead to link an orphan to. Never used to re-point a linked record.
    pub link_lead_master_id: Option<String>,
    pub embedded_patch: EmbeddedData,
}

impl OpportunityUpdate {
    /// Update that only merges display data.
    pub fn merge(embedded_patch: EmbeddedData) -> Self {
        Self {
            link_lead_master_id: None,
            embedded_patch,
        }
    }

    /// Update that links an orphan and merges display data in the same write.
    pub fn link_and_merge(lead_master_id: &str, embedded_patch: EmbeddedData) -> Self {
        Self {
            link_lead_master_id: Some(lead_master_id.to_string()),
            embedded_patch,
        }
    }
}

/// Result of an opportunity lookup.
///
/// Rows that matched but could not be decoded are reported by id instead of
/// failing the whole lookup, so their readable siblings still sync.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpportunityMatches {
    pub records: Vec<OpportunityRecord>,
    pub unreadable_ids: Vec<String>,
}

impl OpportunityMatches {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.unreadable_ids.is_empty()
    }
}

/// Input model for creating an opportunity when a lead is converted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub lead_master_id: Option<String>,
    pub pipeline_id: String,
    pub stage_id: String,
    #[serde(default)]
    pub embedded_data: EmbeddedData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(lead_master_id: Option<&str>) -> OpportunityRecord {
        let now = Utc::now().naive_utc();
        OpportunityRecord {
            id: "O1".to_string(),
            lead_master_id: lead_master_id.map(str::to_string),
            pipeline_id: "P1".to_string(),
            stage_id: "S1".to_string(),
            embedded_data: json!({"nome": "Ana Silva", "etapa_custom": "x"})
                .as_object()
                .cloned()
                .unwrap(),
            created_at: now,
            updated_at: now,
        }
    }

    fn patch(value: Value) -> EmbeddedData {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_overwrites_mapped_and_keeps_others() {
        let mut opportunity = record(Some("L1"));
        opportunity
            .apply_update(&OpportunityUpdate::merge(patch(json!({"nome": "Ana Souza"}))))
            .unwrap();

        assert_eq!(opportunity.embedded_str("nome"), Some("Ana Souza"));
        assert_eq!(opportunity.embedded_str("etapa_custom"), Some("x"));
        assert_eq!(opportunity.lead_master_id.as_deref(), Some("L1"));
    }

    #[test]
    fn test_link_sets_reference_only_from_null() {
        let mut orphan = record(None);
        assert!(orphan.is_orphan());
        orphan
            .apply_update(&OpportunityUpdate::link_and_merge("L1", EmbeddedData::new()))
            .unwrap();
        assert_eq!(orphan.lead_master_id.as_deref(), Some("L1"));

        // Re-linking to the same lead is a no-op.
        orphan
            .apply_update(&OpportunityUpdate::link_and_merge("L1", EmbeddedData::new()))
            .unwrap();
        assert_eq!(orphan.lead_master_id.as_deref(), Some("L1"));
    }

    #[test]
    fn test_link_refuses_to_repoint_linked_record() {
        let mut linked = record(Some("L1"));
        let before = linked.embedded_data.clone();

        let err = linked
            .apply_update(&OpportunityUpdate::link_and_merge(
                "L2",
                patch(json!({"nome": "Someone Else"})),
            ))
            .unwrap_err();

        assert!(matches!(err, OpportunityError::AlreadyLinked { .. }));
        assert_eq!(linked.lead_master_id.as_deref(), Some("L1"));
        assert_eq!(linked.embedded_data, before);
    }

    #[test]
    fn test_field_value_reports_null_reference() {
        let orphan = record(None);
        assert_eq!(orphan.field_value(OpportunityField::LeadMasterId), None);
        assert_eq!(orphan.field_value(OpportunityField::PipelineId), Some("P1"));
    }
}
