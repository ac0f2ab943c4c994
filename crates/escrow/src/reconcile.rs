use crate::release::settle_claimed_job;
use loadhaul_db_schema::{newtypes::JobId, source::job::Job, traits::Crud, utils::DbPool};
use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};
use loadhaul_payment::PaymentGateway;
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};
use tracing::info;

/// Operator recovery for a job parked in capture-failed: take the capture
/// claim again and re-run the settle sequence.
///
/// Safe to repeat. An already-captured hold returns its prior result instead
/// of charging again, and the payout idempotency key dedupes the transfer, so
/// a retry after a partial failure picks up where the money actually stopped.
pub async fn retry_capture(
  pool: &mut DbPool<'_>,
  gateway: &dyn PaymentGateway,
  currency: &str,
  job_id: JobId,
) -> LoadhaulResult<Job> {
  let job = Job::read(pool, job_id).await?;
  if job.status != JobStatus::CaptureFailed {
    return Err(LoadhaulErrorType::JobNotCaptureFailed.into());
  }
  if job.payment_hold_id.is_none() {
    return Err(LoadhaulErrorType::MissingPaymentHold.into());
  }

  let Some(claimed) = Job::claim_capturing_for_retry(pool, job_id).await? else {
    // Another operator or run got there first.
    return Err(LoadhaulErrorType::ConcurrentModification.into());
  };

  info!(%job_id, "operator retry of capture-and-payout");
  settle_claimed_job(pool, gateway, currency, claimed).await
}

/// Operator recovery for a stranded hold: an expired assignment reverted
/// under the `Keep` policy leaves an open job still holding the supplier's
/// funds. Voids the hold at the gateway, then downgrades the payment state.
/// The hold id stays on the row for audit.
pub async fn force_release_hold(
  pool: &mut DbPool<'_>,
  gateway: &dyn PaymentGateway,
  job_id: JobId,
) -> LoadhaulResult<Job> {
  let job = Job::read(pool, job_id).await?;
  if job.status != JobStatus::Open || job.payment_state != PaymentState::Authorized {
    return Err(LoadhaulErrorType::NoStrandedHold.into());
  }
  let hold_id = job
    .payment_hold_id
    .as_deref()
    .ok_or(LoadhaulErrorType::MissingPaymentHold)?;

  gateway.release_hold(hold_id).await?;
  let released = Job::release_stranded_hold(pool, job_id).await?;
  info!(%job_id, hold_id, "stranded payment hold released");
  Ok(released)
}
