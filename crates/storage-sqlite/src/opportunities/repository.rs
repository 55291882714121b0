use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::SqliteConnection;
use log::{debug, warn};
use std::sync::Arc;
use uuid::Uuid;

use leadsync_core::errors::ValidationError;
use leadsync_core::opportunities::{
    NewOpportunity, OpportunityError, OpportunityField, OpportunityMatches, OpportunityRecord,
    OpportunityRepositoryTrait, OpportunityUpdate,
};
use leadsync_core::Result;

use super::model::{serialize_embedded_data, OpportunityDB};
use crate::db::{run_read, DbConnection, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::opportunities;
use crate::utils::format_timestamp;

const OPPORTUNITY_COLUMNS: &str =
    "id, lead_master_id, pipeline_id, stage_id, embedded_data, created_at, updated_at";

pub struct OpportunityRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl OpportunityRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        OpportunityRepository { pool, writer }
    }

    /// Stores an opportunity converted from a lead. A missing id is replaced
    /// with a fresh UUID.
    pub async fn create(&self, new_opportunity: NewOpportunity) -> Result<OpportunityRecord> {
        let now = Utc::now().naive_utc();
        let record = OpportunityRecord {
            id: new_opportunity
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            lead_master_id: new_opportunity.lead_master_id,
            pipeline_id: new_opportunity.pipeline_id,
            stage_id: new_opportunity.stage_id,
            embedded_data: new_opportunity.embedded_data,
            created_at: now,
            updated_at: now,
        };

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<OpportunityRecord> {
                let row = OpportunityDB::try_from(&record)?;
                diesel::insert_into(opportunities::table)
                    .values(&row)
                    .execute(conn)
                    .into_core()?;
                debug!("Created opportunity {}", record.id);
                Ok(record)
            })
            .await
    }

    pub async fn find_by_id(&self, opportunity_id: &str) -> Result<Option<OpportunityRecord>> {
        let opportunity_id = opportunity_id.to_string();
        run_read(&self.pool, move |conn| {
            let row = opportunities::table
                .find(opportunity_id.as_str())
                .select(OpportunityDB::as_select())
                .first::<OpportunityDB>(conn)
                .optional()
                .into_core()?;
            Ok(row.map(OpportunityRecord::try_from).transpose()?)
        })
        .await
    }
}

fn load_by_field(
    conn: &mut DbConnection,
    field: OpportunityField,
    value: &str,
) -> Result<Vec<OpportunityDB>> {
    let mut query = opportunities::table
        .select(OpportunityDB::as_select())
        .into_boxed();
    query = match field {
        OpportunityField::Id => query.filter(opportunities::id.eq(value.to_string())),
        OpportunityField::LeadMasterId => {
            query.filter(opportunities::lead_master_id.eq(value.to_string()))
        }
        OpportunityField::PipelineId => {
            query.filter(opportunities::pipeline_id.eq(value.to_string()))
        }
        OpportunityField::StageId => query.filter(opportunities::stage_id.eq(value.to_string())),
    };
    Ok(query
        .order(opportunities::created_at.asc())
        .load::<OpportunityDB>(conn)
        .into_core()?)
}

/// Lookup by a top-level embedded key.
///
/// The JSON path is written as a literal so SQLite can match it against
/// expression indexes such as `json_extract(embedded_data, '$.email')`. Only
/// plain identifier keys are accepted, which keeps the literal safe.
fn nested_key_query(key: &str) -> Result<String> {
    let is_identifier = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !is_identifier {
        return Err(ValidationError::InvalidInput(format!(
            "Unsupported embedded data key '{}'",
            key
        ))
        .into());
    }
    Ok(format!(
        "SELECT {} FROM opportunities WHERE json_extract(embedded_data, '$.{}') = ?",
        OPPORTUNITY_COLUMNS, key
    ))
}

/// Decodes matched rows. A row that cannot be decoded is reported by id so
/// the rest of the lookup stays usable.
fn into_matches(rows: Vec<OpportunityDB>) -> OpportunityMatches {
    let mut matches = OpportunityMatches::default();
    for row in rows {
        let id = row.id.clone();
        match OpportunityRecord::try_from(row) {
            Ok(record) => matches.records.push(record),
            Err(e) => {
                warn!("Skipping unreadable opportunity {}: {}", id, e);
                matches.unreadable_ids.push(id);
            }
        }
    }
    matches
}

#[async_trait]
impl OpportunityRepositoryTrait for OpportunityRepository {
    async fn find_by_equality(
        &self,
        field: OpportunityField,
        value: &str,
    ) -> Result<OpportunityMatches> {
        let value = value.to_string();
        run_read(&self.pool, move |conn| {
            Ok(into_matches(load_by_field(conn, field, &value)?))
        })
        .await
    }

    async fn find_by_nested_key_equality(
        &self,
        key: &str,
        value: &str,
    ) -> Result<OpportunityMatches> {
        let query = nested_key_query(key)?;
        let value = value.to_string();
        run_read(&self.pool, move |conn| {
            let rows = diesel::sql_query(query)
                .bind::<Text, _>(value)
                .load::<OpportunityDB>(conn)
                .into_core()?;
            Ok(into_matches(rows))
        })
        .await
    }

    async fn update_by_id(
        &self,
        opportunity_id: &str,
        update: OpportunityUpdate,
    ) -> Result<OpportunityRecord> {
        let opportunity_id = opportunity_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<OpportunityRecord> {
                let row = opportunities::table
                    .find(opportunity_id.as_str())
                    .select(OpportunityDB::as_select())
                    .first::<OpportunityDB>(conn)
                    .optional()
                    .into_core()?
                    .ok_or_else(|| OpportunityError::NotFound(opportunity_id.clone()))?;

                let mut record = OpportunityRecord::try_from(row)?;
                record.apply_update(&update)?;

                let embedded = serialize_embedded_data(&record.embedded_data)?;
                diesel::update(opportunities::table.find(opportunity_id.as_str()))
                    .set((
                        opportunities::lead_master_id.eq(record.lead_master_id.clone()),
                        opportunities::embedded_data.eq(embedded),
                        opportunities::updated_at.eq(format_timestamp(&record.updated_at)),
                    ))
                    .execute(conn)
                    .into_core()?;

                debug!(
                    "Updated opportunity {} ({} embedded keys)",
                    record.id,
                    update.embedded_patch.len()
                );
                Ok(record)
            })
            .await
    }
}
