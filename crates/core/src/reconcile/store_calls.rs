//! Bounded store calls and the per-record write fan-out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use log::{debug, warn};

use super::reconcile_model::WriteTally;
use crate::errors::{Error, Result};
use crate::opportunities::{OpportunityRepositoryTrait, OpportunityUpdate};

/// Runs a store call, failing with [`Error::Timeout`] once `limit` elapses.
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            timeout_ms: limit.as_millis() as u64,
        }),
    }
}

/// Writes every update independently and tallies the outcomes.
///
/// Each write runs on its own task, so a caller that stops waiting does not
/// cancel writes that were already dispatched. A failed or timed out write
/// only marks its own record as failed.
pub(crate) async fn write_all(
    repository: &Arc<dyn OpportunityRepositoryTrait>,
    updates: Vec<(String, OpportunityUpdate)>,
    limit: Duration,
) -> WriteTally {
    let handles: Vec<_> = updates
        .into_iter()
        .map(|(opportunity_id, update)| {
            let repository = Arc::clone(repository);
            let task_id = opportunity_id.clone();
            let handle = tokio::spawn(async move {
                bounded(
                    "update_by_id",
                    limit,
                    repository.update_by_id(&task_id, update),
                )
                .await
            });
            (opportunity_id, handle)
        })
        .collect();

    let (ids, handles): (Vec<String>, Vec<_>) = handles.into_iter().unzip();
    let results = join_all(handles).await;

    let mut tally = WriteTally::default();
    for (opportunity_id, joined) in ids.into_iter().zip(results) {
        match joined {
            Ok(Ok(_)) => {
                debug!("Opportunity {} written", opportunity_id);
                tally.record_updated(opportunity_id);
            }
            Ok(Err(e)) => {
                warn!("Write to opportunity {} failed: {}", opportunity_id, e);
                tally.record_failed(opportunity_id);
            }
            Err(e) => {
                warn!("Write task for opportunity {} aborted: {}", opportunity_id, e);
                tally.record_failed(opportunity_id);
            }
        }
    }
    tally
}
