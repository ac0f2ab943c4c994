use crate::newtypes::{Coin, JobId, PersonId};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};
use loadhaul_utils::error::LoadhaulErrorType;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
#[cfg(feature = "full")]
use {
  diesel::prelude::*,
  loadhaul_db_schema_file::schema::jobs,
};

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(
  feature = "full",
  derive(diesel::Queryable, diesel::Selectable, diesel::Identifiable)
)]
#[cfg_attr(feature = "full", diesel(table_name = jobs))]
#[cfg_attr(feature = "full", diesel(primary_key(id)))]
#[cfg_attr(feature = "full", diesel(check_for_backend(diesel::pg::Pg)))]
#[serde(rename_all = "camelCase")]
/// One freight contract. The row is both the state machine and the audit
/// record: asynchronous transitions persist their outcome here.
pub struct Job {
  pub id: JobId,
  pub supplier_person_id: PersonId,
  pub hauler_person_id: Option<PersonId>,
  /// Display snapshot taken at assignment, cleared when the assignment expires.
  pub hauler_name: Option<String>,
  pub cargo_description: String,
  pub origin_address: String,
  pub destination_address: String,
  pub destination_lat: Option<f64>,
  pub destination_lng: Option<f64>,
  /// Supplier-facing price in major units. Never used for arithmetic directly;
  /// converted once into `amount_minor` at authorization time.
  pub price: BigDecimal,
  /// The authoritative amount in minor units, fixed when the hold is created.
  pub amount_minor: Option<Coin>,
  /// Platform fee in basis points (1000 = 10%), frozen at job creation.
  pub platform_fee_bps: i32,
  pub status: JobStatus,
  pub payment_state: PaymentState,
  /// Processor hold reference. Set once, never overwritten.
  pub payment_hold_id: Option<String>,
  /// Processor transfer reference. Set once, on payout success.
  pub payout_id: Option<String>,
  pub payout_amount: Option<Coin>,
  pub platform_fee: Option<Coin>,
  /// Last capture/payout failure, kept for operator visibility.
  pub payment_error: Option<String>,
  pub assigned_at: Option<DateTime<Utc>>,
  pub payment_authorized_at: Option<DateTime<Utc>>,
  pub completed_at: Option<DateTime<Utc>>,
  /// How many times the sweeper reverted this job to open.
  pub expired_count: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl Job {
  /// Validate that a (status, payment_state) pair is one of the legal
  /// combinations. The two fields are orthogonal on the row, so every writer
  /// runs its target pair through this instead of trusting callers to keep
  /// them in sync.
  ///
  /// `(Open, Authorized)` is the documented stranded-hold combination: an
  /// expired assignment reverted under the `Keep` policy leaves the hold in
  /// place until an operator releases it.
  pub fn check_state(
    status: JobStatus,
    payment_state: PaymentState,
  ) -> Result<(), LoadhaulErrorType> {
    let legal = matches!(
      (status, payment_state),
      (JobStatus::Open, PaymentState::None)
        | (JobStatus::Open, PaymentState::Authorized)
        | (JobStatus::Assigned, PaymentState::Authorized)
        | (JobStatus::Transit, PaymentState::Authorized)
        | (JobStatus::Delivered, PaymentState::Authorized)
        | (JobStatus::Delivered, PaymentState::Capturing)
        | (JobStatus::Delivered, PaymentState::Paid)
        | (JobStatus::Paid, PaymentState::Paid)
        | (JobStatus::CaptureFailed, PaymentState::CaptureFailed)
        | (JobStatus::Cancelled, PaymentState::None)
    );
    if legal {
      Ok(())
    } else {
      Err(LoadhaulErrorType::IllegalJobState(format!(
        "{status}/{payment_state}"
      )))
    }
  }
}

#[derive(Debug, Clone, derive_new::new, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(Insertable))]
#[cfg_attr(feature = "full", diesel(table_name = jobs))]
pub struct JobInsertForm {
  pub supplier_person_id: PersonId,
  pub cargo_description: String,
  pub origin_address: String,
  pub destination_address: String,
  #[new(default)]
  pub destination_lat: Option<f64>,
  #[new(default)]
  pub destination_lng: Option<f64>,
  pub price: BigDecimal,
  pub platform_fee_bps: i32,
}

#[derive(Clone, Default)]
#[cfg_attr(feature = "full", derive(AsChangeset))]
#[cfg_attr(feature = "full", diesel(table_name = jobs))]
pub struct JobUpdateForm {
  pub cargo_description: Option<String>,
  pub origin_address: Option<String>,
  pub destination_address: Option<String>,
  pub destination_lat: Option<Option<f64>>,
  pub destination_lng: Option<Option<f64>>,
  pub price: Option<BigDecimal>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use loadhaul_db_schema_file::enums::{JobStatus, PaymentState};

  #[test]
  fn legal_state_combinations() {
    let legal = [
      (JobStatus::Open, PaymentState::None),
      (JobStatus::Open, PaymentState::Authorized),
      (JobStatus::Assigned, PaymentState::Authorized),
      (JobStatus::Transit, PaymentState::Authorized),
      (JobStatus::Delivered, PaymentState::Authorized),
      (JobStatus::Delivered, PaymentState::Capturing),
      (JobStatus::Delivered, PaymentState::Paid),
      (JobStatus::Paid, PaymentState::Paid),
      (JobStatus::CaptureFailed, PaymentState::CaptureFailed),
      (JobStatus::Cancelled, PaymentState::None),
    ];
    for (status, payment_state) in legal {
      Job::check_state(status, payment_state)
        .unwrap_or_else(|_| panic!("{status}/{payment_state} should be legal"));
    }
  }

  #[test]
  fn illegal_state_combinations() {
    let illegal = [
      // assigned without a hold can never happen through the authorize path
      (JobStatus::Assigned, PaymentState::None),
      (JobStatus::Transit, PaymentState::None),
      (JobStatus::Delivered, PaymentState::None),
      // money can't move on a job that never reached delivered
      (JobStatus::Open, PaymentState::Capturing),
      (JobStatus::Open, PaymentState::Paid),
      (JobStatus::Assigned, PaymentState::Paid),
      (JobStatus::Assigned, PaymentState::CaptureFailed),
      // cancellation requires releasing the hold first
      (JobStatus::Cancelled, PaymentState::Authorized),
      (JobStatus::Paid, PaymentState::Capturing),
    ];
    for (status, payment_state) in illegal {
      assert!(
        Job::check_state(status, payment_state).is_err(),
        "{status}/{payment_state} should be illegal"
      );
    }
  }
}
