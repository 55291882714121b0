//! Leads module - master lead models and the read port used by reconciliation.

mod leads_model;
mod leads_traits;


pub use leads_model::{
    fields, LeadSnapshot, LeadStatus, LeadTemperature, MasterLead, RawPatch, UtmSet,
};
pub use leads_traits::LeadRepositoryTrait;
