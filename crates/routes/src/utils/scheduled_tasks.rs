use actix_web::web::Data;
use chrono::Utc;
use clokwerk::{AsyncScheduler, TimeUnits as CTimeUnits};
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::source::job::Job;
use loadhaul_db_schema_file::enums::PaymentState;
use loadhaul_escrow::reconcile::force_release_hold;
use loadhaul_utils::{error::LoadhaulResult, settings::ExpiryHoldPolicy};
use std::time::Duration;
use tracing::{info, warn};

/// Schedules the periodic reconciliation tasks in a background task.
pub async fn setup(context: Data<LoadhaulContext>) -> LoadhaulResult<()> {
  // https://github.com/mdsherry/clokwerk/issues/38
  let mut scheduler = AsyncScheduler::with_tz(Utc);

  let context_1 = context.clone();
  // Check for assignments stuck past the timeout every minute
  scheduler.every(CTimeUnits::minutes(1)).run(move || {
    let context = context_1.clone();

    async move {
      sweep_expired_assignments(&context)
        .await
        .inspect_err(|e| warn!("Failed to sweep expired assignments: {e}"))
        .ok();
    }
  });

  // Manually run the scheduler in an event loop
  loop {
    scheduler.run_pending().await;
    tokio::time::sleep(Duration::from_millis(1000)).await;
  }
}

/// Revert every job stuck in assigned past the configured timeout back to
/// open, freeing the hauler slot for reassignment. Each revert is an
/// independent conditional write, so racing a fresh assignment or a second
/// sweep reverts nothing twice.
///
/// What happens to the payment hold afterwards is the configured
/// [`ExpiryHoldPolicy`].
async fn sweep_expired_assignments(context: &LoadhaulContext) -> LoadhaulResult<()> {
  let escrow = &context.settings().escrow;
  let reverted =
    Job::revert_expired(&mut context.pool(), escrow.assignment_timeout_minutes).await?;
  if reverted.is_empty() {
    return Ok(());
  }

  info!("Reverted {} expired assignment(s) to open", reverted.len());

  match escrow.expiry_hold_policy {
    ExpiryHoldPolicy::Keep => {
      for job in &reverted {
        if job.payment_state == PaymentState::Authorized {
          warn!(
            job_id = %job.id,
            hold_id = job.payment_hold_id.as_deref().unwrap_or_default(),
            "expired job keeps its payment hold; supplier funds stay reserved until an operator releases them"
          );
        }
      }
    }
    ExpiryHoldPolicy::Release => {
      for job in &reverted {
        if job.payment_state != PaymentState::Authorized {
          continue;
        }
        if let Err(e) = force_release_hold(&mut context.pool(), context.gateway(), job.id).await {
          warn!(job_id = %job.id, "failed to release hold on expired job: {e}");
        }
      }
    }
  }

  Ok(())
}
