use crate::{
  CaptureResult, CaptureState, CreateHold, GatewayError, GatewayResult, HoldResult, HoldState,
  PaymentGateway, TransferFunds, TransferResult, TransferState,
};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-memory processor double used by tests. It honors the same idempotency
/// contracts as the live client (replayed keys return prior results, capture
/// of a captured hold returns the first outcome) and records every dispatch
/// so tests can assert how many times money actually moved.
#[derive(Default)]
pub struct TestGateway {
  state: Mutex<TestGatewayState>,
}

#[derive(Default)]
struct TestGatewayState {
  holds_by_key: HashMap<String, String>,
  holds: HashMap<String, HoldRecord>,
  transfers_by_key: HashMap<String, TransferResult>,
  next_id: u32,
  next_hold_state: Option<HoldState>,
  capture_error: Option<GatewayError>,
  transfer_error: Option<GatewayError>,
  capture_calls: u32,
  transfer_dispatches: u32,
  dispatched_transfers: Vec<TransferFunds>,
  released: Vec<String>,
  accounts: Vec<String>,
}

struct HoldRecord {
  amount_minor: i64,
  captured: Option<CaptureResult>,
  released: bool,
  result: HoldResult,
}

impl TestGateway {
  pub fn new() -> Self {
    Self::default()
  }

  /// Make the next hold creation come back `RequiresAction` or `Failed`.
  pub async fn respond_next_hold(&self, state: HoldState) {
    self.state.lock().await.next_hold_state = Some(state);
  }

  /// All capture attempts fail with `error` until cleared.
  pub async fn fail_captures(&self, error: GatewayError) {
    self.state.lock().await.capture_error = Some(error);
  }

  /// All transfer attempts fail with `error` until cleared.
  pub async fn fail_transfers(&self, error: GatewayError) {
    self.state.lock().await.transfer_error = Some(error);
  }

  pub async fn clear_failures(&self) {
    let mut state = self.state.lock().await;
    state.capture_error = None;
    state.transfer_error = None;
  }

  /// How many distinct transfers were dispatched (replays of an idempotency
  /// key do not count; that is the point of the key).
  pub async fn transfer_dispatch_count(&self) -> u32 {
    self.state.lock().await.transfer_dispatches
  }

  pub async fn capture_call_count(&self) -> u32 {
    self.state.lock().await.capture_calls
  }

  /// The transfers that actually moved money, in dispatch order.
  pub async fn dispatched_transfers(&self) -> Vec<TransferFunds> {
    self.state.lock().await.dispatched_transfers.clone()
  }

  pub async fn hold_count(&self) -> usize {
    self.state.lock().await.holds.len()
  }

  pub async fn released_holds(&self) -> Vec<String> {
    self.state.lock().await.released.clone()
  }
}

#[async_trait]
impl PaymentGateway for TestGateway {
  async fn create_hold(&self, req: CreateHold, idempotency_key: &str) -> GatewayResult<HoldResult> {
    let mut state = self.state.lock().await;

    if let Some(hold_id) = state.holds_by_key.get(idempotency_key).cloned() {
      if let Some(record) = state.holds.get(&hold_id) {
        return Ok(record.result.clone());
      }
    }

    state.next_id += 1;
    let hold_id = format!("hold_test_{}", state.next_id);
    let hold_state = state.next_hold_state.take().unwrap_or(HoldState::Held);
    let result = HoldResult {
      hold_id: hold_id.clone(),
      state: hold_state,
      action_token: match hold_state {
        HoldState::RequiresAction => Some(format!("action_token_{}", state.next_id)),
        _ => None,
      },
    };

    state.holds_by_key.insert(idempotency_key.to_string(), hold_id.clone());
    state.holds.insert(
      hold_id,
      HoldRecord {
        amount_minor: req.amount_minor,
        captured: None,
        released: false,
        result: result.clone(),
      },
    );
    Ok(result)
  }

  async fn capture_hold(&self, hold_id: &str) -> GatewayResult<CaptureResult> {
    let mut state = self.state.lock().await;
    state.capture_calls += 1;

    if let Some(error) = state.capture_error.clone() {
      return Err(error);
    }

    let record = state
      .holds
      .get_mut(hold_id)
      .ok_or_else(|| GatewayError::Permanent(format!("no such hold {hold_id}")))?;
    if record.released {
      return Err(GatewayError::Permanent(format!("hold {hold_id} was released")));
    }
    if let Some(prior) = record.captured.clone() {
      return Ok(prior);
    }

    let result = CaptureResult {
      state: CaptureState::Captured,
      captured_minor: record.amount_minor,
    };
    record.captured = Some(result.clone());
    Ok(result)
  }

  async fn release_hold(&self, hold_id: &str) -> GatewayResult<()> {
    let mut state = self.state.lock().await;

    let record = state
      .holds
      .get_mut(hold_id)
      .ok_or_else(|| GatewayError::Permanent(format!("no such hold {hold_id}")))?;
    if record.captured.is_some() {
      return Err(GatewayError::Permanent(format!(
        "hold {hold_id} is already captured"
      )));
    }
    record.released = true;
    state.released.push(hold_id.to_string());
    Ok(())
  }

  async fn transfer_funds(
    &self,
    req: TransferFunds,
    idempotency_key: &str,
  ) -> GatewayResult<TransferResult> {
    let mut state = self.state.lock().await;

    if let Some(error) = state.transfer_error.clone() {
      return Err(error);
    }
    if let Some(prior) = state.transfers_by_key.get(idempotency_key).cloned() {
      return Ok(prior);
    }

    state.next_id += 1;
    state.transfer_dispatches += 1;
    state.dispatched_transfers.push(req);
    let result = TransferResult {
      transfer_id: format!("transfer_test_{}", state.next_id),
      state: TransferState::Completed,
    };
    state
      .transfers_by_key
      .insert(idempotency_key.to_string(), result.clone());
    Ok(result)
  }

  async fn create_account(&self, email: &str) -> GatewayResult<String> {
    let mut state = self.state.lock().await;
    state.next_id += 1;
    let account_id = format!("acct_test_{}", state.next_id);
    state.accounts.push(format!("{account_id}:{email}"));
    Ok(account_id)
  }

  async fn create_onboarding_link(&self, account_id: &str) -> GatewayResult<String> {
    Ok(format!("https://onboarding.test/{account_id}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{hold_idempotency_key, payout_idempotency_key};
  use pretty_assertions::assert_eq;

  fn hold_request(amount_minor: i64) -> CreateHold {
    CreateHold {
      amount_minor,
      currency: "usd".to_string(),
      payment_method_ref: "pm_card".to_string(),
      payer_account_ref: None,
      job_id: "7".to_string(),
      supplier_ref: "1".to_string(),
      hauler_ref: "2".to_string(),
    }
  }

  #[tokio::test]
  async fn replayed_hold_key_never_creates_a_second_hold() {
    let gateway = TestGateway::new();
    let key = hold_idempotency_key(7);

    let first = gateway.create_hold(hold_request(50_000), &key).await.expect("hold");
    let second = gateway.create_hold(hold_request(50_000), &key).await.expect("hold");

    assert_eq!(first.hold_id, second.hold_id);
    assert_eq!(1, gateway.hold_count().await);
  }

  #[tokio::test]
  async fn capture_is_idempotent() {
    let gateway = TestGateway::new();
    let hold = gateway
      .create_hold(hold_request(50_000), &hold_idempotency_key(7))
      .await
      .expect("hold");

    let first = gateway.capture_hold(&hold.hold_id).await.expect("capture");
    let second = gateway.capture_hold(&hold.hold_id).await.expect("capture");

    assert_eq!(CaptureState::Captured, first.state);
    assert_eq!(first.captured_minor, second.captured_minor);
    assert_eq!(50_000, first.captured_minor);
  }

  #[tokio::test]
  async fn replayed_payout_key_dispatches_once() {
    let gateway = TestGateway::new();
    let key = payout_idempotency_key(7);
    let transfer = TransferFunds {
      amount_minor: 45_000,
      currency: "usd".to_string(),
      destination_account_ref: "acct_hauler".to_string(),
      job_id: "7".to_string(),
    };

    let first = gateway.transfer_funds(transfer.clone(), &key).await.expect("transfer");
    let second = gateway.transfer_funds(transfer, &key).await.expect("transfer");

    assert_eq!(first.transfer_id, second.transfer_id);
    assert_eq!(1, gateway.transfer_dispatch_count().await);
  }

  #[tokio::test]
  async fn released_hold_cannot_be_captured() {
    let gateway = TestGateway::new();
    let hold = gateway
      .create_hold(hold_request(10_000), &hold_idempotency_key(9))
      .await
      .expect("hold");

    gateway.release_hold(&hold.hold_id).await.expect("release");
    assert!(gateway.capture_hold(&hold.hold_id).await.is_err());
    assert_eq!(vec![hold.hold_id], gateway.released_holds().await);
  }
}
