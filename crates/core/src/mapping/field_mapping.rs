//! Declarative lead → embedded-data mapping table.
//!
//! This is the single table shared by every write path (inline edits, form
//! saves, bulk updates, full resyncs). Bump [`FIELD_MAPPING_VERSION`] whenever
//! an entry changes so downstream consumers can tell payloads apart.

use crate::constants::{EMBEDDED_DISPLAY_NAME_KEY, EMBEDDED_EMAIL_KEY};
use crate::leads::fields;

pub const FIELD_MAPPING_VERSION: u32 = 1;

/// How a lead value is turned into an embedded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldHandler {
    /// Copied unchanged.
    Direct,
    /// Locale-aware number; unparsable input maps to null.
    Numeric,
    /// Recomputed from the complete snapshot, never from the patch alone.
    CompositeName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldMapping {
    pub source: &'static str,
    pub target: &'static str,
    pub handler: FieldHandler,
}

const fn entry(source: &'static str, target: &'static str, handler: FieldHandler) -> FieldMapping {
    FieldMapping {
        source,
        target,
        handler,
    }
}

pub const FIELD_MAPPINGS: &[FieldMapping] = &[
    entry(fields::FIRST_NAME, EMBEDDED_DISPLAY_NAME_KEY, FieldHandler::CompositeName),
    entry(fields::LAST_NAME, EMBEDDED_DISPLAY_NAME_KEY, FieldHandler::CompositeName),
    entry(fields::EMAIL, EMBEDDED_EMAIL_KEY, FieldHandler::Direct),
    entry(fields::PHONE, "telefone", FieldHandler::Direct),
    entry(fields::STATUS, "status", FieldHandler::Direct),
    entry(fields::TEMPERATURE, "temperatura", FieldHandler::Direct),
    entry(fields::OWNER_ID, "responsavel_id", FieldHandler::Direct),
    entry(fields::SOURCE, "origem", FieldHandler::Direct),
    entry(fields::CAMPAIGN, "campanha", FieldHandler::Direct),
    entry(fields::UTM_SOURCE, "utm_source", FieldHandler::Direct),
    entry(fields::UTM_MEDIUM, "utm_medium", FieldHandler::Direct),
    entry(fields::UTM_CAMPAIGN, "utm_campaign", FieldHandler::Direct),
    entry(fields::UTM_TERM, "utm_term", FieldHandler::Direct),
    entry(fields::UTM_CONTENT, "utm_content", FieldHandler::Direct),
    entry(fields::NOTES, "observacoes", FieldHandler::Direct),
    entry(fields::ESTIMATED_VALUE, "valor", FieldHandler::Numeric),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_sources_are_unique() {
        let mut seen = HashSet::new();
        for mapping in FIELD_MAPPINGS {
            assert!(seen.insert(mapping.source), "duplicate source {}", mapping.source);
        }
    }

    #[test]
    fn test_only_name_fields_are_composite() {
        let composite: Vec<&str> = FIELD_MAPPINGS
            .iter()
            .filter(|m| m.handler == FieldHandler::CompositeName)
            .map(|m| m.source)
            .collect();
        assert_eq!(composite, vec![fields::FIRST_NAME, fields::LAST_NAME]);
    }
}
