use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::{debug, warn};

use super::reconcile_model::SyncMethod;
use crate::events::{DomainEvent, DomainEventSink};
use crate::leads::RawPatch;
use crate::opportunities::EmbeddedData;

/// Publishes one event per sync. Publishing never blocks the sync and never
/// fails it, whatever the sink does.
pub struct ChangeNotifier {
    sink: Arc<dyn DomainEventSink>,
}

impl ChangeNotifier {
    pub fn new(sink: Arc<dyn DomainEventSink>) -> Self {
        Self { sink }
    }

    pub fn publish(
        &self,
        lead_master_id: &str,
        raw_patch: &RawPatch,
        mapped_patch: &EmbeddedData,
        affected_ids: &[String],
        method: SyncMethod,
    ) {
        let event = DomainEvent::lead_opportunities_synced(
            lead_master_id.to_string(),
            raw_patch.clone(),
            mapped_patch.clone(),
            affected_ids.to_vec(),
            method,
        );

        let sink = &self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| sink.emit(event))) {
            Ok(()) => debug!("Published sync event for lead {}", lead_master_id),
            Err(_) => warn!(
                "Event sink panicked while publishing sync of lead {}",
                lead_master_id
            ),
        }
    }
}
