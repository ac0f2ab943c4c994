#[cfg(feature = "full")]
use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
#[cfg_attr(feature = "full", derive(DbEnum))]
#[cfg_attr(
  feature = "full",
  ExistingTypePath = "crate::schema::sql_types::JobStatusEnum"
)]
#[cfg_attr(feature = "full", DbValueStyle = "verbatim")]
/// The logistics status of a freight job. Orthogonal to [`PaymentState`]: this
/// reflects where the cargo is, not where the money is.
pub enum JobStatus {
  /// Listed and available for assignment.
  #[default]
  Open,
  /// A hauler is assigned and a payment hold is in place.
  Assigned,
  /// The hauler reported picking up the cargo.
  Transit,
  /// A signed proof of delivery has been accepted.
  Delivered,
  Paid,
  /// Capture or payout failed after delivery; needs operator attention.
  CaptureFailed,
  Cancelled,
}

#[derive(
  EnumString, Display, Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, Hash,
)]
#[cfg_attr(feature = "full", derive(DbEnum))]
#[cfg_attr(
  feature = "full",
  ExistingTypePath = "crate::schema::sql_types::PaymentStateEnum"
)]
#[cfg_attr(feature = "full", DbValueStyle = "verbatim")]
/// The escrow lifecycle of a job's money, tracked independently of [`JobStatus`].
pub enum PaymentState {
  #[default]
  None,
  /// A hold exists against the supplier's payment method.
  Authorized,
  /// Exclusive claim taken by a capture-and-payout run. Not a durable resting
  /// state; a crash here is recovered through operator reconciliation.
  Capturing,
  /// Funds captured and the hauler's share transferred. Terminal.
  Paid,
  /// Capture or transfer failed; funds may be captured but undisbursed.
  CaptureFailed,
}
