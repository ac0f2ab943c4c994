use async_trait::async_trait;
use loadhaul_utils::error::{LoadhaulError, LoadhaulErrorType};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::Display;

pub mod stripe;
pub mod test_gateway;

/// Typed failure modes of the payment processor. Retry policy lives with the
/// caller: this crate only says whether a retry of the same logical operation
/// can possibly succeed.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GatewayError {
  #[strum(to_string = "insufficient funds")]
  InsufficientFunds,
  /// The payer's bank demands an extra authentication step.
  #[strum(to_string = "payer authentication required")]
  ActionRequired,
  #[strum(to_string = "destination account invalid")]
  DestinationAccountInvalid,
  /// Network-level failure; the idempotency key makes a retry safe.
  #[strum(to_string = "transient network error: {0}")]
  TransientNetwork(String),
  /// The processor rejected the operation for good; retrying is pointless.
  #[strum(to_string = "permanent processor error: {0}")]
  Permanent(String),
}

impl GatewayError {
  pub fn is_retryable(&self) -> bool {
    matches!(self, GatewayError::TransientNetwork(_))
  }
}

impl From<GatewayError> for LoadhaulError {
  fn from(e: GatewayError) -> Self {
    LoadhaulErrorType::PaymentGatewayError(e.to_string()).into()
  }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Idempotency key for the single hold a job may ever have. Retrying hold
/// creation after a timeout re-sends this key, so the processor can never end
/// up with two holds for one job.
pub fn hold_idempotency_key(job_id: impl fmt::Display) -> String {
  format!("{job_id}-hold")
}

/// Idempotency key for the single payout a job may ever have.
pub fn payout_idempotency_key(job_id: impl fmt::Display) -> String {
  format!("{job_id}-payout")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateHold {
  pub amount_minor: i64,
  pub currency: String,
  pub payment_method_ref: String,
  /// Processor customer reference of the payer, when one is on file.
  pub payer_account_ref: Option<String>,
  pub job_id: String,
  pub supplier_ref: String,
  pub hauler_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HoldState {
  /// Funds reserved; capturable until released.
  Held,
  /// The payer must complete an authentication step before the hold exists.
  RequiresAction,
  Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldResult {
  pub hold_id: String,
  pub state: HoldState,
  /// Token the caller needs to complete a `RequiresAction` hold.
  pub action_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaptureState {
  Captured,
  Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
  pub state: CaptureState,
  pub captured_minor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferFunds {
  pub amount_minor: i64,
  pub currency: String,
  pub destination_account_ref: String,
  pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferState {
  Completed,
  Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferResult {
  pub transfer_id: String,
  pub state: TransferState,
}

/// Capability boundary around the external payment processor. Everything the
/// escrow lifecycle needs: a reversible hold, its capture or release, a
/// split transfer, and payee onboarding. All state lives in the processor's
/// ledger; this side only keeps the opaque ids.
///
/// Idempotency contract: `create_hold` and `transfer_funds` take a
/// caller-supplied key and must return the prior result when the key is
/// replayed; `capture_hold` must return the prior result for an
/// already-captured hold instead of double-charging.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_hold(&self, req: CreateHold, idempotency_key: &str) -> GatewayResult<HoldResult>;

  async fn capture_hold(&self, hold_id: &str) -> GatewayResult<CaptureResult>;

  /// Void an uncaptured hold, returning the reserved funds to the payer.
  async fn release_hold(&self, hold_id: &str) -> GatewayResult<()>;

  async fn transfer_funds(
    &self,
    req: TransferFunds,
    idempotency_key: &str,
  ) -> GatewayResult<TransferResult>;

  /// Create a payout account for a hauler. Idempotency is handled by the
  /// caller, which stores the account id and never asks twice.
  async fn create_account(&self, email: &str) -> GatewayResult<String>;

  async fn create_onboarding_link(&self, account_id: &str) -> GatewayResult<String>;
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn idempotency_keys_are_stable_per_job() {
    assert_eq!("17-hold", hold_idempotency_key(17));
    assert_eq!("17-payout", payout_idempotency_key(17));
    assert_ne!(hold_idempotency_key(17), payout_idempotency_key(17));
    assert_ne!(hold_idempotency_key(17), hold_idempotency_key(18));
  }

  #[test]
  fn only_network_errors_are_retryable() {
    assert!(GatewayError::TransientNetwork("timeout".into()).is_retryable());
    assert!(!GatewayError::InsufficientFunds.is_retryable());
    assert!(!GatewayError::Permanent("account closed".into()).is_retryable());
    assert!(!GatewayError::DestinationAccountInvalid.is_retryable());
  }
}
