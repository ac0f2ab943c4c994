use actix_web::{
  web::{Bytes, Data},
  HttpRequest, HttpResponse,
};
use chrono::Utc;
use loadhaul_api_utils::context::LoadhaulContext;
use loadhaul_db_schema::source::local_user::LocalUser;
use loadhaul_utils::{
  error::{LoadhaulErrorType, LoadhaulResult},
  signature::{verify_signature, WEBHOOK_SIGNATURE_HEADER},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct ProcessorEvent {
  #[serde(rename = "type")]
  kind: String,
  data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
  object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct AccountObject {
  id: String,
  #[serde(default)]
  payouts_enabled: bool,
  #[serde(default)]
  charges_enabled: bool,
  #[serde(default)]
  details_submitted: bool,
}

/// POST /api/v1/payments/webhook
///
/// Asynchronous account-verification events from the payment processor. The
/// signature is checked over the untouched body bytes before anything parses
/// them; the raw stream is what the processor signed. There is no unsigned
/// mode; startup refuses a configuration without a webhook secret.
///
/// Every verified, parseable event is acknowledged with 200, including types
/// this system ignores; the processor retries anything else.
pub async fn process_processor_webhook(
  req: HttpRequest,
  body: Bytes,
  context: Data<LoadhaulContext>,
) -> LoadhaulResult<HttpResponse> {
  let header = req
    .headers()
    .get(WEBHOOK_SIGNATURE_HEADER)
    .and_then(|header| header.to_str().ok())
    .ok_or(LoadhaulErrorType::WebhookSignatureInvalid)?;
  verify_signature(
    &context.settings().payment.webhook_secret,
    header,
    &body,
    Utc::now().timestamp(),
  )?;

  let event: ProcessorEvent =
    serde_json::from_slice(&body).map_err(|_| LoadhaulErrorType::WebhookPayloadInvalid)?;

  if event.kind == "account.updated" {
    let account: AccountObject = serde_json::from_value(event.data.object)
      .map_err(|_| LoadhaulErrorType::WebhookPayloadInvalid)?;
    let is_verified = account.payouts_enabled && account.charges_enabled;
    let updated = LocalUser::update_verification_for_account(
      &mut context.pool(),
      &account.id,
      is_verified,
      account.details_submitted,
    )
    .await?;
    info!(
      account_id = %account.id,
      is_verified,
      updated,
      "applied account verification event"
    );
  } else {
    debug!(kind = %event.kind, "ignoring processor event");
  }

  Ok(HttpResponse::Ok().json(json!({ "received": true })))
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn parses_an_account_updated_envelope() {
    let body = br#"{
      "id": "evt_1",
      "type": "account.updated",
      "data": {
        "object": {
          "id": "acct_123",
          "object": "account",
          "charges_enabled": true,
          "payouts_enabled": true,
          "details_submitted": true
        }
      }
    }"#;

    let event: ProcessorEvent = serde_json::from_slice(body).expect("parses");
    assert_eq!("account.updated", event.kind);

    let account: AccountObject = serde_json::from_value(event.data.object).expect("parses");
    assert_eq!("acct_123", account.id);
    assert!(account.payouts_enabled && account.charges_enabled);
    assert!(account.details_submitted);
  }

  #[test]
  fn missing_capability_flags_default_to_false() {
    let object = serde_json::json!({ "id": "acct_123" });
    let account: AccountObject = serde_json::from_value(object).expect("parses");
    assert!(!account.payouts_enabled);
    assert!(!account.charges_enabled);
    assert!(!account.details_submitted);
  }

  #[test]
  fn unrelated_event_types_still_parse() {
    let body = br#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_1"}}}"#;
    let event: ProcessorEvent = serde_json::from_slice(body).expect("parses");
    assert_eq!("payment_intent.succeeded", event.kind);
  }
}
