use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use std::sync::Arc;
use uuid::Uuid;

use leadsync_core::leads::{LeadRepositoryTrait, MasterLead};
use leadsync_core::Result;

use super::model::LeadDB;
use crate::db::{run_read, DbPool, WriteHandle};
use crate::errors::IntoCore;
use crate::schema::leads;

pub struct LeadRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LeadRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LeadRepository { pool, writer }
    }

    /// Stores a lead at intake. A blank id is replaced with a fresh UUID and
    /// both timestamps are set to now.
    pub async fn create(&self, mut lead: MasterLead) -> Result<MasterLead> {
        if lead.id.trim().is_empty() {
            lead.id = Uuid::new_v4().to_string();
        }
        let now = Utc::now().naive_utc();
        lead.created_at = now;
        lead.updated_at = now;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<MasterLead> {
                let lead_db = LeadDB::from(lead);
                let stored = diesel::insert_into(leads::table)
                    .values(&lead_db)
                    .returning(LeadDB::as_returning())
                    .get_result(conn)
                    .into_core()?;
                debug!("Created lead {}", stored.id);
                Ok(MasterLead::try_from(stored)?)
            })
            .await
    }
}

#[async_trait]
impl LeadRepositoryTrait for LeadRepository {
    async fn find_by_id(&self, lead_id: &str) -> Result<Option<MasterLead>> {
        let lead_id = lead_id.to_string();
        run_read(&self.pool, move |conn| {
            let row = leads::table
                .find(lead_id.as_str())
                .select(LeadDB::as_select())
                .first::<LeadDB>(conn)
                .optional()
                .into_core()?;
            Ok(row.map(MasterLead::try_from).transpose()?)
        })
        .await
    }
}
