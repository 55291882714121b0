//! Database models for master leads.

use std::str::FromStr;

use diesel::prelude::*;
use rust_decimal::Decimal;

use leadsync_core::leads::{LeadStatus, LeadTemperature, MasterLead, UtmSet};

use crate::errors::StorageError;
use crate::utils::{format_timestamp, parse_timestamp};

/// Database model for leads
#[derive(Queryable, Identifiable, Insertable, Selectable, PartialEq, Debug, Clone)]
#[diesel(table_name = crate::schema::leads)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LeadDB {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: String,
    pub temperature: String,
    pub owner_id: Option<String>,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
    pub notes: Option<String>,
    pub estimated_value: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<LeadDB> for MasterLead {
    type Error = StorageError;

    fn try_from(db: LeadDB) -> Result<Self, Self::Error> {
        let status = LeadStatus::from_str(&db.status)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let temperature = LeadTemperature::from_str(&db.temperature)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let estimated_value = db
            .estimated_value
            .as_deref()
            .map(Decimal::from_str)
            .transpose()
            .map_err(|e| {
                StorageError::SerializationError(format!(
                    "Invalid estimated value for lead {}: {}",
                    db.id, e
                ))
            })?;

        Ok(MasterLead {
            status,
            temperature,
            estimated_value,
            created_at: parse_timestamp(&db.created_at)?,
            updated_at: parse_timestamp(&db.updated_at)?,
            id: db.id,
            first_name: db.first_name,
            last_name: db.last_name,
            email: db.email,
            phone: db.phone,
            owner_id: db.owner_id,
            utm: UtmSet {
                source: db.utm_source,
                medium: db.utm_medium,
                campaign: db.utm_campaign,
                term: db.utm_term,
                content: db.utm_content,
            },
            source: db.source,
            campaign: db.campaign,
            notes: db.notes,
        })
    }
}

impl From<MasterLead> for LeadDB {
    fn from(domain: MasterLead) -> Self {
        Self {
            status: domain.status.as_str().to_string(),
            temperature: domain.temperature.as_str().to_string(),
            estimated_value: domain.estimated_value.map(|v| v.to_string()),
            created_at: format_timestamp(&domain.created_at),
            updated_at: format_timestamp(&domain.updated_at),
            id: domain.id,
            first_name: domain.first_name,
            last_name: domain.last_name,
            email: domain.email,
            phone: domain.phone,
            owner_id: domain.owner_id,
            source: domain.source,
            campaign: domain.campaign,
            utm_source: domain.utm.source,
            utm_medium: domain.utm.medium,
            utm_campaign: domain.utm.campaign,
            utm_term: domain.utm.term,
            utm_content: domain.utm.content,
            notes: domain.notes,
        }
    }
}
