//! Field mapping - lead fields to opportunity embedded data.

mod field_mapper;
mod field_mapping;
mod numeric;

pub use field_mapper::{validate_patch, FieldMapper};
pub use field_mapping::{FieldHandler, FieldMapping, FIELD_MAPPINGS, FIELD_MAPPING_VERSION};
pub use numeric::{numeric_value, parse_locale_number};
