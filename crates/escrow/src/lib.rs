use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use loadhaul_db_schema::{
  impls::job::AssignmentClaim,
  newtypes::{Coin, PersonId},
  source::{job::Job, local_user::LocalUser},
  utils::DbPool,
};
use loadhaul_db_schema_file::enums::JobStatus;
use loadhaul_payment::{hold_idempotency_key, CreateHold, GatewayError, HoldState, PaymentGateway};
use loadhaul_utils::error::{LoadhaulErrorType, LoadhaulResult};
use tracing::{debug, warn};

pub mod events;
pub mod reconcile;
pub mod release;

/// Convert the supplier-facing major-unit price into the authoritative
/// minor-unit amount, rounding half up. This happens exactly once per job, at
/// authorization time; every later computation works on the integer result.
pub fn amount_from_price(price: &BigDecimal) -> Result<Coin, LoadhaulErrorType> {
  if *price <= BigDecimal::from(0) {
    return Err(LoadhaulErrorType::NegativeAmount);
  }
  (price * BigDecimal::from(100))
    .with_scale_round(0, RoundingMode::HalfUp)
    .to_i64()
    .map(Coin)
    .ok_or(LoadhaulErrorType::AmountOutOfRange)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PayoutSplit {
  pub hauler_payout: Coin,
  pub platform_fee: Coin,
}

/// Split a captured amount into the platform fee and the hauler payout.
/// Integer arithmetic throughout; the fee rounds half up and the payout is the
/// exact remainder, so `fee + payout == captured` always holds.
pub fn split_payout(captured_minor: i64, fee_bps: i32) -> Result<PayoutSplit, LoadhaulErrorType> {
  if captured_minor < 0 {
    return Err(LoadhaulErrorType::NegativeAmount);
  }
  if !(0..=10_000).contains(&fee_bps) {
    return Err(LoadhaulErrorType::InvalidFeeRate);
  }
  let fee = i64::try_from((i128::from(captured_minor) * i128::from(fee_bps) + 5_000) / 10_000)
    .map_err(|_| LoadhaulErrorType::AmountOutOfRange)?;
  Ok(PayoutSplit {
    hauler_payout: Coin(captured_minor - fee),
    platform_fee: Coin(fee),
  })
}

/// Everything the supplier-facing surface supplies to start the lock.
#[derive(Debug, Clone)]
pub struct AuthorizeCommand {
  pub caller_person_id: PersonId,
  pub hauler_person_id: PersonId,
  pub hauler_name: Option<String>,
  pub payment_method_ref: String,
  /// Processor customer reference of the supplier, when one is on file.
  pub payer_account_ref: Option<String>,
}

#[derive(Debug, Clone)]
pub enum AuthorizeOutcome {
  /// The hold is in place and the job moved to assigned.
  Authorized(Job),
  /// The payer's bank wants an extra authentication step. The job was not
  /// touched; the caller completes the action and invokes authorization again.
  RequiresAction { action_token: String },
}

/// The caller-error checks of the authorization transition, split out so they
/// can be tested without a gateway or a database. The conditional write in
/// [`authorize_payment`] re-verifies ownership and openness; this front check
/// exists to reject bad requests before any money is reserved.
pub fn check_authorize_preconditions(
  job: &Job,
  cmd: &AuthorizeCommand,
) -> Result<(), LoadhaulErrorType> {
  if job.supplier_person_id != cmd.caller_person_id {
    return Err(LoadhaulErrorType::NotJobSupplier);
  }
  if job.status != JobStatus::Open {
    return Err(LoadhaulErrorType::JobNotOpen);
  }
  if cmd.payment_method_ref.trim().is_empty() {
    return Err(LoadhaulErrorType::InvalidField(
      "paymentMethodRef is required".to_string(),
    ));
  }
  Ok(())
}

/// The Lock: reserve the supplier's funds and move the job to assigned.
///
/// The hold is created first, under the job's fixed idempotency key, so a
/// retry after a timeout can never end up with two holds. Only a confirmed
/// `Held` result mutates the job, through a conditional write keyed on the
/// job still being open and owned by the caller. Two racing authorize calls
/// therefore both observe the same single hold, and exactly one of them wins
/// the assignment.
pub async fn authorize_payment(
  pool: &mut DbPool<'_>,
  gateway: &dyn PaymentGateway,
  currency: &str,
  job: &Job,
  cmd: AuthorizeCommand,
) -> LoadhaulResult<AuthorizeOutcome> {
  check_authorize_preconditions(job, &cmd)?;
  let amount_minor = amount_from_price(&job.price)?;
  // Bookkeeping only at this point; the fee is collected at payout time, from
  // whatever amount the capture actually returns.
  let projected = split_payout(amount_minor.0, job.platform_fee_bps)?;
  debug!(
    job_id = %job.id,
    amount_minor = %amount_minor,
    projected_fee = %projected.platform_fee,
    "authorizing escrow hold"
  );

  // Advisory only: an unverified hauler may be assigned, but the payout will
  // fail loudly later if they never onboard a destination account.
  let hauler_trust = LocalUser::find_by_person(pool, cmd.hauler_person_id).await?;
  if !hauler_trust.is_some_and(|u| u.is_payout_verified) {
    warn!(
      job_id = %job.id,
      hauler_person_id = %cmd.hauler_person_id,
      "assigning job to hauler without a verified payout account"
    );
  }

  let hold = gateway
    .create_hold(
      CreateHold {
        amount_minor: amount_minor.0,
        currency: currency.to_string(),
        payment_method_ref: cmd.payment_method_ref.clone(),
        payer_account_ref: cmd.payer_account_ref.clone(),
        job_id: job.id.to_string(),
        supplier_ref: job.supplier_person_id.to_string(),
        hauler_ref: cmd.hauler_person_id.to_string(),
      },
      &hold_idempotency_key(job.id),
    )
    .await
    .map_err(|e| match e {
      GatewayError::TransientNetwork(_) => LoadhaulErrorType::PaymentGatewayError(e.to_string()),
      _ => LoadhaulErrorType::PaymentAuthorizationDeclined(e.to_string()),
    })?;

  match hold.state {
    HoldState::RequiresAction => {
      let action_token = hold
        .action_token
        .ok_or_else(|| LoadhaulErrorType::PaymentAuthorizationDeclined(
          "processor demanded an action but supplied no token".to_string(),
        ))?;
      Ok(AuthorizeOutcome::RequiresAction { action_token })
    }
    HoldState::Failed => {
      Err(LoadhaulErrorType::PaymentAuthorizationDeclined("hold was declined".to_string()).into())
    }
    HoldState::Held => {
      let job = Job::claim_assignment(
        pool,
        job.id,
        cmd.caller_person_id,
        &job.price,
        AssignmentClaim {
          hauler_person_id: cmd.hauler_person_id,
          hauler_name: cmd.hauler_name,
          payment_hold_id: hold.hold_id,
          amount_minor,
        },
      )
      .await?;
      Ok(AuthorizeOutcome::Authorized(job))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use bigdecimal::FromPrimitive;
  use chrono::Utc;
  use loadhaul_db_schema::newtypes::JobId;
  use loadhaul_db_schema_file::enums::PaymentState;
  use pretty_assertions::assert_eq;
  use std::str::FromStr;

  pub(crate) fn open_job() -> Job {
    Job {
      id: JobId(7),
      supplier_person_id: PersonId(1),
      hauler_person_id: None,
      hauler_name: None,
      cargo_description: "20 pallets of maize".to_string(),
      origin_address: "Harare".to_string(),
      destination_address: "Bulawayo".to_string(),
      destination_lat: Some(-20.1367),
      destination_lng: Some(28.5818),
      price: BigDecimal::from(500),
      amount_minor: None,
      platform_fee_bps: 1000,
      status: JobStatus::Open,
      payment_state: PaymentState::None,
      payment_hold_id: None,
      payout_id: None,
      payout_amount: None,
      platform_fee: None,
      payment_error: None,
      assigned_at: None,
      payment_authorized_at: None,
      completed_at: None,
      expired_count: 0,
      created_at: Utc::now(),
      updated_at: Utc::now(),
    }
  }

  fn command() -> AuthorizeCommand {
    AuthorizeCommand {
      caller_person_id: PersonId(1),
      hauler_person_id: PersonId(2),
      hauler_name: Some("T. Moyo".to_string()),
      payment_method_ref: "pm_card_visa".to_string(),
      payer_account_ref: None,
    }
  }

  #[test]
  fn price_converts_to_minor_units() {
    let amount = amount_from_price(&BigDecimal::from(500)).expect("valid price");
    assert_eq!(Coin(50_000), amount);

    // half-up on a fractional cent
    let odd = BigDecimal::from_str("10.005").expect("parses");
    assert_eq!(Coin(1_001), amount_from_price(&odd).expect("valid price"));
  }

  #[test]
  fn rejects_non_positive_price() {
    assert_eq!(
      Err(LoadhaulErrorType::NegativeAmount),
      amount_from_price(&BigDecimal::from(0))
    );
    assert_eq!(
      Err(LoadhaulErrorType::NegativeAmount),
      amount_from_price(&BigDecimal::from(-25))
    );
  }

  #[test]
  fn rejects_price_beyond_minor_unit_range() {
    let absurd = BigDecimal::from_f64(1e30).expect("finite");
    assert_eq!(
      Err(LoadhaulErrorType::AmountOutOfRange),
      amount_from_price(&absurd)
    );
  }

  #[test]
  fn split_is_exact() {
    let split = split_payout(50_000, 1000).expect("valid split");
    assert_eq!(Coin(5_000), split.platform_fee);
    assert_eq!(Coin(45_000), split.hauler_payout);

    // no rounding drift, even on amounts that don't divide evenly
    for captured in [1, 99, 999, 1_000, 10_001, 33_333, i64::MAX / 20_000] {
      for bps in [0, 1, 250, 1000, 9_999, 10_000] {
        let split = split_payout(captured, bps).expect("valid split");
        assert_eq!(
          captured,
          split.platform_fee.0 + split.hauler_payout.0,
          "fee + payout must equal captured for {captured}/{bps}"
        );
      }
    }
  }

  #[test]
  fn fee_rounds_half_up() {
    // 10001 * 10% = 1000.1 -> 1000
    assert_eq!(
      Coin(1_000),
      split_payout(10_001, 1000).expect("valid").platform_fee
    );
    // 5 * 10% = 0.5 -> 1
    assert_eq!(Coin(1), split_payout(5, 1000).expect("valid").platform_fee);
  }

  #[test]
  fn split_rejects_bad_inputs() {
    assert_eq!(
      Err(LoadhaulErrorType::NegativeAmount),
      split_payout(-1, 1000)
    );
    assert_eq!(
      Err(LoadhaulErrorType::InvalidFeeRate),
      split_payout(1_000, 10_001)
    );
    assert_eq!(Err(LoadhaulErrorType::InvalidFeeRate), split_payout(1_000, -1));
  }

  #[test]
  fn only_the_supplier_may_authorize() {
    let job = open_job();
    let mut cmd = command();
    cmd.caller_person_id = PersonId(99);
    assert_eq!(
      Err(LoadhaulErrorType::NotJobSupplier),
      check_authorize_preconditions(&job, &cmd)
    );
  }

  #[test]
  fn only_open_jobs_may_be_authorized() {
    let mut job = open_job();
    job.status = JobStatus::Assigned;
    job.payment_state = PaymentState::Authorized;
    assert_eq!(
      Err(LoadhaulErrorType::JobNotOpen),
      check_authorize_preconditions(&job, &command())
    );
  }

  #[test]
  fn payment_method_is_required() {
    let job = open_job();
    let mut cmd = command();
    cmd.payment_method_ref = "  ".to_string();
    assert!(matches!(
      check_authorize_preconditions(&job, &cmd),
      Err(LoadhaulErrorType::InvalidField(_))
    ));
  }

  #[test]
  fn reassignment_after_expiry_is_allowed() {
    // An expired job reverted under the Keep policy is open again but still
    // carries its hold; authorization must accept it (the shared idempotency
    // key returns the same hold).
    let mut job = open_job();
    job.payment_state = PaymentState::Authorized;
    job.payment_hold_id = Some("hold_test_1".to_string());
    job.expired_count = 1;
    assert_eq!(Ok(()), check_authorize_preconditions(&job, &command()));
  }
}
