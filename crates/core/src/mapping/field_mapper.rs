use serde_json::Value;

use super::field_mapping::{FieldHandler, FieldMapping, FIELD_MAPPINGS, FIELD_MAPPING_VERSION};
use super::numeric::numeric_value;
use crate::errors::ValidationError;
use crate::leads::{fields, LeadSnapshot, LeadStatus, LeadTemperature, RawPatch};
use crate::opportunities::EmbeddedData;

/// Turns lead edits into embedded-data patches using the mapping table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    mappings: &'static [FieldMapping],
    version: u32,
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMapper {
    pub fn new() -> Self {
        Self {
            mappings: FIELD_MAPPINGS,
            version: FIELD_MAPPING_VERSION,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn mapping_for(&self, source: &str) -> Option<&'static FieldMapping> {
        self.mappings.iter().find(|m| m.source == source)
    }

    /// Maps a raw lead patch into a flat patch for shallow-merging into any
    /// opportunity's embedded data.
    ///
    /// `snapshot` must be the complete lead with `raw_patch` already applied;
    /// composite values are rebuilt from it. Keys without a mapping pass
    /// through verbatim.
    pub fn map_patch(&self, raw_patch: &RawPatch, snapshot: &LeadSnapshot) -> EmbeddedData {
        let mut mapped = EmbeddedData::new();
        for (key, value) in raw_patch {
            match self.mapping_for(key) {
                Some(mapping) => {
                    mapped.insert(
                        mapping.target.to_string(),
                        self.apply(mapping, value, snapshot),
                    );
                }
                None => {
                    mapped.insert(key.clone(), Value::String(value.clone()));
                }
            }
        }
        mapped
    }

    /// Projects every mapped field of the lead, for full resyncs and for
    /// writing a freshly converted opportunity.
    pub fn project_lead(&self, snapshot: &LeadSnapshot) -> EmbeddedData {
        let mut projected = EmbeddedData::new();
        for mapping in self.mappings {
            if projected.contains_key(mapping.target) {
                continue;
            }
            let value = match mapping.handler {
                FieldHandler::CompositeName => composite_name(snapshot),
                _ => match snapshot.get(mapping.source) {
                    Some(value) => self.apply(mapping, value, snapshot),
                    None => continue,
                },
            };
            projected.insert(mapping.target.to_string(), value);
        }
        projected
    }

    fn apply(&self, mapping: &FieldMapping, value: &str, snapshot: &LeadSnapshot) -> Value {
        match mapping.handler {
            FieldHandler::Direct => Value::String(value.to_string()),
            FieldHandler::Numeric => numeric_value(value),
            FieldHandler::CompositeName => composite_name(snapshot),
        }
    }
}

fn composite_name(snapshot: &LeadSnapshot) -> Value {
    snapshot
        .full_name()
        .map(Value::String)
        .unwrap_or(Value::Null)
}

/// Rejects patches carrying values that cannot be mapped.
///
/// Runs before any store access. Numeric fields are deliberately absent:
/// they degrade to null instead of failing the edit.
pub fn validate_patch(raw_patch: &RawPatch) -> Result<(), ValidationError> {
    if raw_patch.is_empty() {
        return Err(ValidationError::InvalidInput("patch is empty".to_string()));
    }
    if raw_patch.contains_key(fields::ID) {
        return Err(ValidationError::InvalidInput(
            "the lead id cannot be edited".to_string(),
        ));
    }
    if let Some(status) = raw_patch.get(fields::STATUS) {
        status.parse::<LeadStatus>()?;
    }
    if let Some(temperature) = raw_patch.get(fields::TEMPERATURE) {
        temperature.parse::<LeadTemperature>()?;
    }
    if let Some(email) = raw_patch.get(fields::EMAIL) {
        if !looks_like_email(email) {
            return Err(ValidationError::InvalidValue {
                field: fields::EMAIL.to_string(),
                value: email.clone(),
            });
        }
    }
    Ok(())
}

fn looks_like_email(value: &str) -> bool {
    let value = value.trim();
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}
