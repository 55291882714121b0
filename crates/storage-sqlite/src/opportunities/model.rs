//! Database models for opportunities.

use diesel::prelude::*;
use serde_json::Value;

use leadsync_core::opportunities::{EmbeddedData, OpportunityRecord};

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

/// Database model for opportunities. `embedded_data` holds a JSON object.
#[derive(
    Queryable, QueryableByName, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone,
)]
#[diesel(table_name = crate::schema::opportunities)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct OpportunityDB {
    pub id: String,
    pub lead_master_id: Option<String>,
    pub pipeline_id: String,
    pub stage_id: String,
    pub embedded_data: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Parses a stored blob. Anything but a JSON object is rejected rather than
/// silently replaced, so a later merge cannot wipe unreadable data.
pub fn parse_embedded_data(opportunity_id: &str, raw: &str) -> Result<EmbeddedData, StorageError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StorageError::SerializationError(format!(
            "Embedded data of opportunity {} is not an object: {}",
            opportunity_id, other
        ))),
        Err(e) => Err(StorageError::SerializationError(format!(
            "Embedded data of opportunity {} is not valid JSON: {}",
            opportunity_id, e
        ))),
    }
}

pub fn serialize_embedded_data(data: &EmbeddedData) -> Result<String, StorageError> {
    serde_json::to_string(data).map_err(|e| StorageError::SerializationError(e.to_string()))
}

impl TryFrom<OpportunityDB> for OpportunityRecord {
    type Error = StorageError;

    fn try_from(db: OpportunityDB) -> Result<Self, Self::Error> {
        Ok(OpportunityRecord {
            embedded_data: parse_embedded_data(&db.id, &db.embedded_data)?,
            created_at: parse_timestamp(&db.created_at)?,
            updated_at: parse_timestamp(&db.updated_at)?,
            id: db.id,
            lead_master_id: db.lead_master_id,
            pipeline_id: db.pipeline_id,
            stage_id: db.stage_id,
        })
    }
}

impl TryFrom<&OpportunityRecord> for OpportunityDB {
    type Error = StorageError;

    fn try_from(record: &OpportunityRecord) -> Result<Self, Self::Error> {
        Ok(OpportunityDB {
            id: record.id.clone(),
            lead_master_id: record.lead_master_id.clone(),
            pipeline_id: record.pipeline_id.clone(),
            stage_id: record.stage_id.clone(),
            embedded_data: serialize_embedded_data(&record.embedded_data)?,
            created_at: format_timestamp(&record.created_at),
            updated_at: format_timestamp(&record.updated_at),
        })
    }
}
