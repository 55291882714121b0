//! Reconciliation module - keeps opportunity records consistent with their
//! master lead when the lead is edited.
//!
//! An edit flows through validation, the field mapper, the identity
//! resolver and the per-record write fan-out. When no record references the
//! lead, the orphan linker is the last fallback tier. Every sync ends with a
//! single domain event.

mod change_notifier;
mod identity_resolver;
mod orphan_linker;
mod reconcile_config;
mod reconcile_model;
mod reconcile_service;
mod reconcile_traits;
mod store_calls;

#[cfg(test)]
pub(crate) mod testing;

pub use change_notifier::ChangeNotifier;
pub use identity_resolver::{IdentityResolver, ReferenceTier, Resolution};
pub use orphan_linker::{OrphanLinkOutcome, OrphanLinker};
pub use reconcile_config::ReconcileConfig;
pub use reconcile_model::{LeadEdit, SyncFailure, SyncMethod, SyncResult, SyncStatus};
pub use reconcile_service::ReconciliationService;
pub use reconcile_traits::ReconciliationServiceTrait;
