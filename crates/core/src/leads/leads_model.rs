//! Master lead domain models.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Field edit coming from any lead edit path, keyed by lead field name.
pub type RawPatch = BTreeMap<String, String>;

/// Lead field names as used by edit paths and snapshots.
pub mod fields {
    pub const ID: &str = "id";
    pub const FIRST_NAME: &str = "first_name";
    pub const LAST_NAME: &str = "last_name";
    pub const EMAIL: &str = "email";
    pub const PHONE: &str = "phone";
    pub const STATUS: &str = "status";
    pub const TEMPERATURE: &str = "temperature";
    pub const OWNER_ID: &str = "owner_id";
    pub const SOURCE: &str = "source";
    pub const CAMPAIGN: &str = "campaign";
    pub const UTM_SOURCE: &str = "utm_source";
    pub const UTM_MEDIUM: &str = "utm_medium";
    pub const UTM_CAMPAIGN: &str = "utm_campaign";
    pub const UTM_TERM: &str = "utm_term";
    pub const UTM_CONTENT: &str = "utm_content";
    pub const NOTES: &str = "notes";
    /// Estimated deal value, named as the lead forms submit it.
    pub const ESTIMATED_VALUE: &str = "valor";
}

/// Funnel status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Proposal,
    Negotiation,
    Won,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Proposal => "proposal",
            LeadStatus::Negotiation => "negotiation",
            LeadStatus::Won => "won",
            LeadStatus::Lost => "lost",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "new" => Ok(LeadStatus::New),
            "contacted" => Ok(LeadStatus::Contacted),
            "qualified" => Ok(LeadStatus::Qualified),
            "proposal" => Ok(LeadStatus::Proposal),
            "negotiation" => Ok(LeadStatus::Negotiation),
            "won" => Ok(LeadStatus::Won),
            "lost" => Ok(LeadStatus::Lost),
            _ => Err(ValidationError::InvalidValue {
                field: fields::STATUS.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sales temperature of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LeadTemperature {
    #[default]
    Cold,
    Warm,
    Hot,
}

impl LeadTemperature {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadTemperature::Cold => "cold",
            LeadTemperature::Warm => "warm",
            LeadTemperature::Hot => "hot",
        }
    }
}

impl FromStr for LeadTemperature {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cold" => Ok(LeadTemperature::Cold),
            "warm" => Ok(LeadTemperature::Warm),
            "hot" => Ok(LeadTemperature::Hot),
            _ => Err(ValidationError::InvalidValue {
                field: fields::TEMPERATURE.to_string(),
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LeadTemperature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Marketing attribution captured at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UtmSet {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

/// Domain model representing the authoritative lead record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MasterLead {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: LeadStatus,
    pub temperature: LeadTemperature,
    pub owner_id: Option<String>,
    pub utm: UtmSet,
    pub source: Option<String>,
    pub campaign: Option<String>,
    pub notes: Option<String>,
    pub estimated_value: Option<Decimal>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl MasterLead {
    /// Flattens the lead into a snapshot keyed by lead field names.
    pub fn snapshot(&self) -> LeadSnapshot {
        let mut values = BTreeMap::new();
        values.insert(fields::ID.to_string(), self.id.clone());
        values.insert(fields::STATUS.to_string(), self.status.to_string());
        values.insert(fields::TEMPERATURE.to_string(), self.temperature.to_string());

        let optional = [
            (fields::FIRST_NAME, &self.first_name),
            (fields::LAST_NAME, &self.last_name),
            (fields::EMAIL, &self.email),
            (fields::PHONE, &self.phone),
            (fields::OWNER_ID, &self.owner_id),
            (fields::SOURCE, &self.source),
            (fields::CAMPAIGN, &self.campaign),
            (fields::UTM_SOURCE, &self.utm.source),
            (fields::UTM_MEDIUM, &self.utm.medium),
            (fields::UTM_CAMPAIGN, &self.utm.campaign),
            (fields::UTM_TERM, &self.utm.term),
            (fields::UTM_CONTENT, &self.utm.content),
            (fields::NOTES, &self.notes),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                values.insert(key.to_string(), value.clone());
            }
        }
        if let Some(value) = self.estimated_value {
            values.insert(fields::ESTIMATED_VALUE.to_string(), value.to_string());
        }

        LeadSnapshot { values }
    }
}

/// Complete, flat view of a lead at the moment of an edit.
///
/// Built from the stored lead and overlaid with the incoming patch, so
/// derived values (such as the display name) always see every field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LeadSnapshot {
    values: BTreeMap<String, String>,
}

impl LeadSnapshot {
    pub fn from_fields(values: BTreeMap<String, String>) -> Self {
        Self { values }
    }

    /// Returns a copy of this snapshot with the patch values applied on top.
    pub fn with_patch(&self, patch: &RawPatch) -> Self {
        let mut values = self.values.clone();
        for (key, value) in patch {
            values.insert(key.clone(), value.clone());
        }
        Self { values }
    }

    /// Raw value of a field, if present.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    /// Trimmed value of a field, `None` when absent or blank.
    pub fn non_blank(&self, field: &str) -> Option<&str> {
        self.get(field).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn email(&self) -> Option<&str> {
        self.non_blank(fields::EMAIL)
    }

    /// Display name recombined from first and last name.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [fields::FIRST_NAME, fields::LAST_NAME]
            .iter()
            .filter_map(|field| self.non_blank(field))
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.values.iter()
    }
}
