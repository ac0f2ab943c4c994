use crate::{events::JobEvent, split_payout};
use loadhaul_db_schema::{
  impls::job::PayoutRecord,
  newtypes::JobId,
  source::{delivery_proof::DeliveryProof, job::Job, local_user::LocalUser},
  utils::DbPool,
};
use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};
use loadhaul_payment::{payout_idempotency_key, CaptureState, PaymentGateway, TransferFunds, TransferState};
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};
use tracing::{debug, error, info};

/// Why a capture-and-payout trigger was ignored. None of these are errors:
/// the event channel is at-least-once and fires for every job update, so most
/// deliveries are expected to fall through a guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseDecision {
  Proceed,
  /// The update was not a transition into delivered.
  NotIntoDelivered,
  /// No proof yet, or the proof carries an empty signature. Logged and left
  /// alone; a proof submission will re-fire the trigger.
  ProofNotReady,
  /// Money already moved, or another run holds the capture claim.
  AlreadySettled,
  /// A delivered job with no authorization behind it. Data-integrity fault:
  /// logged, never guessed around.
  MissingHold,
}

#[derive(Debug)]
pub enum ReleaseOutcome {
  /// The run went through capture; the job's payment state says whether it
  /// ended paid or parked in capture-failed.
  Settled(Job),
  Skipped(ReleaseDecision),
  /// A concurrent run took the capture claim first.
  Lost,
}

/// The guard sequence of the Release, in order. Pure over the event snapshots
/// and the proof read, so every path is testable without a database.
pub fn release_decision(
  before_status: JobStatus,
  after: &Job,
  proof: Option<&DeliveryProof>,
) -> ReleaseDecision {
  if before_status == JobStatus::Delivered || after.status != JobStatus::Delivered {
    return ReleaseDecision::NotIntoDelivered;
  }
  if !proof.is_some_and(DeliveryProof::has_signature) {
    return ReleaseDecision::ProofNotReady;
  }
  if matches!(
    after.payment_state,
    PaymentState::Paid | PaymentState::Capturing
  ) {
    return ReleaseDecision::AlreadySettled;
  }
  if after.payment_hold_id.is_none() {
    return ReleaseDecision::MissingHold;
  }
  ReleaseDecision::Proceed
}

/// The Release: consume one job-change event and, when the guards pass, run
/// capture-and-payout exactly once.
///
/// Delivery of events is at-least-once; safety comes from the guards plus the
/// exclusive `Capturing` claim, not from the channel. The concurrent loser of
/// the claim exits silently.
pub async fn handle_job_event(
  pool: &mut DbPool<'_>,
  gateway: &dyn PaymentGateway,
  currency: &str,
  event: &JobEvent,
) -> LoadhaulResult<ReleaseOutcome> {
  let job_id = event.after.id;

  // Cheap snapshot-only guard before touching the proof table.
  if event.before.status == JobStatus::Delivered || event.after.status != JobStatus::Delivered {
    return Ok(ReleaseOutcome::Skipped(ReleaseDecision::NotIntoDelivered));
  }

  let proof = DeliveryProof::read_for_job(pool, job_id).await?;
  match release_decision(event.before.status, &event.after, proof.as_ref()) {
    ReleaseDecision::Proceed => {}
    decision @ ReleaseDecision::ProofNotReady => {
      info!(%job_id, "job delivered without a usable proof; payout not yet ready");
      return Ok(ReleaseOutcome::Skipped(decision));
    }
    decision @ ReleaseDecision::MissingHold => {
      error!(
        %job_id,
        "delivered job has no payment hold; leaving untouched for manual intervention"
      );
      return Ok(ReleaseOutcome::Skipped(decision));
    }
    decision => {
      debug!(%job_id, ?decision, "capture-and-payout trigger ignored");
      return Ok(ReleaseOutcome::Skipped(decision));
    }
  }

  // Exclusive claim, conditional on the payment state this event observed.
  let Some(claimed) = Job::claim_capturing(pool, job_id, event.after.payment_state).await? else {
    debug!(%job_id, "lost the capture claim to a concurrent trigger");
    return Ok(ReleaseOutcome::Lost);
  };

  let settled = settle_claimed_job(pool, gateway, currency, claimed).await?;
  Ok(ReleaseOutcome::Settled(settled))
}

/// Capture the hold, resolve the destination, split, transfer, and record the
/// outcome. The caller must already hold the `Capturing` claim on this job.
///
/// Every failure from the first gateway call onward parks the job in
/// capture-failed with the error on the row; at that point funds may sit
/// captured but undisbursed, which is exactly the state an operator has to
/// look at before anything retries.
pub(crate) async fn settle_claimed_job(
  pool: &mut DbPool<'_>,
  gateway: &dyn PaymentGateway,
  currency: &str,
  job: Job,
) -> LoadhaulResult<Job> {
  let job_id = job.id;

  let Some(hold_id) = job.payment_hold_id.clone() else {
    // Unreachable through the guards; parked rather than guessed around.
    return park_capture_failed(pool, job_id, &LoadhaulErrorType::MissingPaymentHold.to_string())
      .await;
  };

  let captured = match gateway.capture_hold(&hold_id).await {
    Ok(result) if result.state == CaptureState::Captured => result,
    Ok(_) => {
      return park_capture_failed(pool, job_id, "processor declined the capture").await;
    }
    Err(e) => {
      return park_capture_failed(pool, job_id, &format!("capture failed: {e}")).await;
    }
  };

  let Some(hauler_person_id) = job.hauler_person_id else {
    return park_capture_failed(pool, job_id, "no hauler recorded on the job").await;
  };
  let destination = match LocalUser::payout_account_for_person(pool, hauler_person_id).await? {
    Some(destination) => destination,
    None => {
      // Funds are captured from the supplier but cannot be disbursed. The
      // advisory warning at authorization time announced this possibility.
      return park_capture_failed(
        pool,
        job_id,
        &LoadhaulErrorType::HaulerPayoutAccountMissing.to_string(),
      )
      .await;
    }
  };

  let split = match split_payout(captured.captured_minor, job.platform_fee_bps) {
    Ok(split) => split,
    Err(e) => return park_capture_failed(pool, job_id, &e.to_string()).await,
  };

  let transfer = match gateway
    .transfer_funds(
      TransferFunds {
        amount_minor: split.hauler_payout.0,
        currency: currency.to_string(),
        destination_account_ref: destination,
        job_id: job_id.to_string(),
      },
      &payout_idempotency_key(job_id),
    )
    .await
  {
    Ok(result) if result.state == TransferState::Completed => result,
    Ok(_) => {
      return park_capture_failed(pool, job_id, "processor declined the transfer").await;
    }
    Err(e) => {
      return park_capture_failed(pool, job_id, &format!("transfer failed: {e}")).await;
    }
  };

  let paid = Job::mark_paid(
    pool,
    job_id,
    PayoutRecord {
      payout_id: transfer.transfer_id,
      payout_amount: split.hauler_payout,
      platform_fee: split.platform_fee,
    },
  )
  .await?;

  info!(
    %job_id,
    payout_id = %paid.payout_id.as_deref().unwrap_or_default(),
    payout_amount = %split.hauler_payout,
    platform_fee = %split.platform_fee,
    "escrow released"
  );
  Ok(paid)
}

async fn park_capture_failed(
  pool: &mut DbPool<'_>,
  job_id: JobId,
  message: &str,
) -> LoadhaulResult<Job> {
  error!(%job_id, message, "capture-and-payout failed; job parked for operator reconciliation");
  Job::mark_capture_failed(pool, job_id, message).await
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::tests::open_job;
  use chrono::Utc;
  use loadhaul_db_schema::newtypes::{DeliveryProofId, PersonId};
  use pretty_assertions::assert_eq;

  fn delivered_job() -> Job {
    let mut job = open_job();
    job.status = JobStatus::Delivered;
    job.payment_state = PaymentState::Authorized;
    job.hauler_person_id = Some(PersonId(2));
    job.payment_hold_id = Some("hold_test_1".to_string());
    job
  }

  fn signed_proof() -> DeliveryProof {
    DeliveryProof {
      id: DeliveryProofId(1),
      job_id: delivered_job().id,
      signature_data: "data:image/png;base64,iVBOR".to_string(),
      latitude: None,
      longitude: None,
      distance_deviation_m: None,
      photo_url: None,
      captured_at: Utc::now(),
    }
  }

  #[test]
  fn proceeds_on_a_clean_delivery() {
    let job = delivered_job();
    let proof = signed_proof();
    assert_eq!(
      ReleaseDecision::Proceed,
      release_decision(JobStatus::Transit, &job, Some(&proof))
    );
    assert_eq!(
      ReleaseDecision::Proceed,
      release_decision(JobStatus::Assigned, &job, Some(&proof))
    );
  }

  #[test]
  fn ignores_updates_that_are_not_a_delivery_transition() {
    let job = delivered_job();
    let proof = signed_proof();

    // already delivered before the update: some unrelated field changed
    assert_eq!(
      ReleaseDecision::NotIntoDelivered,
      release_decision(JobStatus::Delivered, &job, Some(&proof))
    );

    // not delivered after the update
    let mut assigned = delivered_job();
    assigned.status = JobStatus::Assigned;
    assert_eq!(
      ReleaseDecision::NotIntoDelivered,
      release_decision(JobStatus::Open, &assigned, Some(&proof))
    );
  }

  #[test]
  fn waits_for_a_usable_proof() {
    let job = delivered_job();
    assert_eq!(
      ReleaseDecision::ProofNotReady,
      release_decision(JobStatus::Transit, &job, None)
    );

    let mut unsigned = signed_proof();
    unsigned.signature_data = String::new();
    assert_eq!(
      ReleaseDecision::ProofNotReady,
      release_decision(JobStatus::Transit, &job, Some(&unsigned))
    );
  }

  #[test]
  fn never_settles_twice() {
    let proof = signed_proof();

    let mut paid = delivered_job();
    paid.payment_state = PaymentState::Paid;
    assert_eq!(
      ReleaseDecision::AlreadySettled,
      release_decision(JobStatus::Transit, &paid, Some(&proof))
    );

    let mut capturing = delivered_job();
    capturing.payment_state = PaymentState::Capturing;
    assert_eq!(
      ReleaseDecision::AlreadySettled,
      release_decision(JobStatus::Transit, &capturing, Some(&proof))
    );
  }

  #[test]
  fn a_parked_job_is_not_retried_by_the_trigger() {
    // A replayed event cannot restart capture for a job that already failed;
    // only the operator retry endpoint re-enters the claim.
    let mut parked = delivered_job();
    parked.status = JobStatus::CaptureFailed;
    parked.payment_state = PaymentState::CaptureFailed;
    assert_eq!(
      ReleaseDecision::NotIntoDelivered,
      release_decision(JobStatus::Transit, &parked, Some(&signed_proof()))
    );
  }

  #[test]
  fn flags_a_delivery_without_a_hold() {
    let mut job = delivered_job();
    job.payment_hold_id = None;
    assert_eq!(
      ReleaseDecision::MissingHold,
      release_decision(JobStatus::Transit, &job, Some(&signed_proof()))
    );
  }
}
