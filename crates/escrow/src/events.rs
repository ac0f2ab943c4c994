use crate::release;
use loadhaul_db_schema::{source::job::Job, utils::ActualDbPool};
use loadhaul_payment::PaymentGateway;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A change to a job row: the snapshot a writer read and the row it produced.
/// Published after the write commits, so a consumer reading the database sees
/// at least the state in `after`.
#[derive(Debug, Clone)]
pub struct JobEvent {
  pub before: Job,
  pub after: Job,
}

/// Enough slack that a burst of deliveries never makes a publisher wait on
/// the consumer's gateway calls.
const JOB_EVENT_CHANNEL_CAPACITY: usize = 256;

pub fn job_event_channel() -> (mpsc::Sender<JobEvent>, mpsc::Receiver<JobEvent>) {
  mpsc::channel(JOB_EVENT_CHANNEL_CAPACITY)
}

/// Run the capture-and-payout consumer until every sender is dropped.
///
/// Delivery is at-least-once and unordered across jobs: a duplicate or stale
/// event is harmless because every handler run re-reads the row and takes the
/// conditional capture claim. An error from one event is logged and the loop
/// moves on; the job it concerned is either untouched or parked in
/// capture-failed, both operator-recoverable.
pub fn spawn_release_consumer(
  pool: ActualDbPool,
  gateway: Arc<dyn PaymentGateway>,
  currency: String,
  mut events: mpsc::Receiver<JobEvent>,
) -> JoinHandle<()> {
  tokio::spawn(async move {
    while let Some(event) = events.recv().await {
      let job_id = event.after.id;
      match release::handle_job_event(&mut (&pool).into(), gateway.as_ref(), &currency, &event)
        .await
      {
        Ok(outcome) => debug!(%job_id, ?outcome, "job event consumed"),
        Err(e) => error!(%job_id, "job event handling failed: {e}"),
      }
    }
    info!("job event channel closed; release consumer exiting");
  })
}
