use loadhaul_db_schema::{
  source::job::Job,
  utils::{ActualDbPool, DbPool},
};
use loadhaul_escrow::events::JobEvent;
use loadhaul_payment::PaymentGateway;
use loadhaul_utils::settings::Settings;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::error;

/// Everything a request handler needs, built once at startup and cloned per
/// worker. The gateway sits behind its trait so tests run the whole surface
/// against the in-memory fake.
#[derive(Clone)]
pub struct LoadhaulContext {
  pool: Arc<ActualDbPool>,
  gateway: Arc<dyn PaymentGateway>,
  settings: Arc<Settings>,
  job_events: mpsc::Sender<JobEvent>,
}

impl LoadhaulContext {
  pub fn create(
    pool: ActualDbPool,
    gateway: Arc<dyn PaymentGateway>,
    settings: Settings,
    job_events: mpsc::Sender<JobEvent>,
  ) -> LoadhaulContext {
    LoadhaulContext {
      pool: Arc::new(pool),
      gateway,
      settings: Arc::new(settings),
      job_events,
    }
  }

  pub fn pool(&self) -> DbPool<'_> {
    DbPool::Pool(&self.pool)
  }

  pub fn inner_pool(&self) -> &ActualDbPool {
    &self.pool
  }

  pub fn gateway(&self) -> &dyn PaymentGateway {
    self.gateway.as_ref()
  }

  pub fn settings(&self) -> &Settings {
    &self.settings
  }

  /// Hand a committed job change to the escrow consumer. At-least-once from
  /// the consumer's point of view; a send failure here means the consumer is
  /// gone, which only the operator reconciliation path can compensate for.
  pub async fn publish_job_event(&self, before: Job, after: Job) {
    let job_id = after.id;
    if self.job_events.send(JobEvent { before, after }).await.is_err() {
      error!(%job_id, "job event consumer is gone; change event dropped");
    }
  }
}
