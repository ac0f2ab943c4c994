use crate::{
  CaptureResult, CaptureState, CreateHold, GatewayError, GatewayResult, HoldResult, HoldState,
  PaymentGateway, TransferFunds, TransferResult, TransferState,
};
use async_trait::async_trait;
use loadhaul_utils::settings::PaymentSettings;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use url::Url;

/// REST client for a Stripe-shaped processor: form-encoded requests, basic
/// auth with the secret key, `Idempotency-Key` header for replay safety.
///
/// Built from an explicitly passed [`PaymentSettings`]; it never reads
/// configuration from global scope, which is what lets tests swap in
/// [`crate::test_gateway::TestGateway`] behind the same trait.
pub struct StripeGateway {
  client: Client,
  api_base: Url,
  secret_key: String,
  /// Where the processor sends haulers back after onboarding.
  onboarding_return_base: String,
}

impl StripeGateway {
  pub fn new(settings: &PaymentSettings, hostname: &str) -> Self {
    StripeGateway {
      client: Client::new(),
      api_base: settings.api_base.clone(),
      secret_key: settings.secret_key.clone(),
      onboarding_return_base: format!("https://{hostname}/dashboard"),
    }
  }

  fn endpoint(&self, path: &str) -> GatewayResult<Url> {
    self.api_base
      .join(path)
      .map_err(|e| GatewayError::Permanent(format!("invalid endpoint {path}: {e}")))
  }

  async fn post_form<T: for<'de> Deserialize<'de>>(
    &self,
    path: &str,
    params: &[(&str, String)],
    idempotency_key: Option<&str>,
  ) -> GatewayResult<T> {
    let url = self.endpoint(path)?;
    let mut request = self
      .client
      .post(url)
      .basic_auth(&self.secret_key, None::<&str>)
      .form(params);
    if let Some(key) = idempotency_key {
      request = request.header("Idempotency-Key", key);
    }

    let response = request
      .send()
      .await
      .map_err(|e| GatewayError::TransientNetwork(e.to_string()))?;

    let status = response.status();
    if status.is_success() {
      response
        .json::<T>()
        .await
        .map_err(|e| GatewayError::Permanent(format!("unexpected response body: {e}")))
    } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
      Err(GatewayError::TransientNetwork(format!(
        "processor returned {status}"
      )))
    } else {
      let envelope = response
        .json::<ErrorEnvelope>()
        .await
        .map_err(|e| GatewayError::Permanent(format!("unexpected error body: {e}")))?;
      Err(map_processor_error(envelope.error))
    }
  }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
  error: ProcessorError,
}

#[derive(Debug, Deserialize, Default)]
struct ProcessorError {
  #[serde(default)]
  code: Option<String>,
  #[serde(default)]
  decline_code: Option<String>,
  #[serde(default)]
  param: Option<String>,
  #[serde(default)]
  message: Option<String>,
}

fn map_processor_error(error: ProcessorError) -> GatewayError {
  let code = error
    .decline_code
    .as_deref()
    .or(error.code.as_deref())
    .unwrap_or_default();
  match code {
    "insufficient_funds" => GatewayError::InsufficientFunds,
    "authentication_required" => GatewayError::ActionRequired,
    "account_invalid" | "no_such_destination" => GatewayError::DestinationAccountInvalid,
    _ if error.param.as_deref() == Some("destination") => {
      GatewayError::DestinationAccountInvalid
    }
    _ => GatewayError::Permanent(
      error
        .message
        .unwrap_or_else(|| "processor rejected the request".to_string()),
    ),
  }
}

#[derive(Debug, Deserialize)]
struct PaymentIntent {
  id: String,
  status: String,
  #[serde(default)]
  amount_received: Option<i64>,
  #[serde(default)]
  client_secret: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Transfer {
  id: String,
}

#[derive(Debug, Deserialize)]
struct Account {
  id: String,
}

#[derive(Debug, Deserialize)]
struct AccountLink {
  url: String,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  async fn create_hold(
    &self,
    req: CreateHold,
    idempotency_key: &str,
  ) -> GatewayResult<HoldResult> {
    let mut params = vec![
      ("amount", req.amount_minor.to_string()),
      ("currency", req.currency.clone()),
      ("payment_method", req.payment_method_ref.clone()),
      ("confirm", "true".to_string()),
      ("capture_method", "manual".to_string()),
      ("metadata[jobId]", req.job_id.clone()),
      ("metadata[supplierId]", req.supplier_ref.clone()),
      ("metadata[haulerId]", req.hauler_ref.clone()),
      ("metadata[type]", "escrow_payment".to_string()),
    ];
    if let Some(customer) = req.payer_account_ref.clone() {
      params.push(("customer", customer));
    }

    let intent: PaymentIntent = self
      .post_form("v1/payment_intents", &params, Some(idempotency_key))
      .await?;

    let result = match intent.status.as_str() {
      "requires_capture" => HoldResult {
        hold_id: intent.id,
        state: HoldState::Held,
        action_token: None,
      },
      "requires_action" => HoldResult {
        hold_id: intent.id,
        state: HoldState::RequiresAction,
        action_token: intent.client_secret,
      },
      _ => HoldResult {
        hold_id: intent.id,
        state: HoldState::Failed,
        action_token: None,
      },
    };
    Ok(result)
  }

  async fn capture_hold(&self, hold_id: &str) -> GatewayResult<CaptureResult> {
    let intent: PaymentIntent = self
      .post_form(
        &format!("v1/payment_intents/{hold_id}/capture"),
        &[],
        None,
      )
      .await?;

    if intent.status == "succeeded" {
      Ok(CaptureResult {
        state: CaptureState::Captured,
        captured_minor: intent.amount_received.unwrap_or_default(),
      })
    } else {
      Ok(CaptureResult {
        state: CaptureState::Failed,
        captured_minor: 0,
      })
    }
  }

  async fn release_hold(&self, hold_id: &str) -> GatewayResult<()> {
    let _: PaymentIntent = self
      .post_form(&format!("v1/payment_intents/{hold_id}/cancel"), &[], None)
      .await?;
    Ok(())
  }

  async fn transfer_funds(
    &self,
    req: TransferFunds,
    idempotency_key: &str,
  ) -> GatewayResult<TransferResult> {
    let params = [
      ("amount", req.amount_minor.to_string()),
      ("currency", req.currency.clone()),
      ("destination", req.destination_account_ref.clone()),
      ("metadata[jobId]", req.job_id.clone()),
      ("metadata[type]", "hauler_payout".to_string()),
    ];

    let transfer: Transfer = self
      .post_form("v1/transfers", &params, Some(idempotency_key))
      .await?;

    Ok(TransferResult {
      transfer_id: transfer.id,
      state: TransferState::Completed,
    })
  }

  async fn create_account(&self, email: &str) -> GatewayResult<String> {
    let params = [
      ("type", "express".to_string()),
      ("email", email.to_string()),
      ("capabilities[transfers][requested]", "true".to_string()),
    ];

    let account: Account = self.post_form("v1/accounts", &params, None).await?;
    Ok(account.id)
  }

  async fn create_onboarding_link(&self, account_id: &str) -> GatewayResult<String> {
    let params = [
      ("account", account_id.to_string()),
      ("type", "account_onboarding".to_string()),
      (
        "refresh_url",
        format!("{}?onboarding_refresh=true", self.onboarding_return_base),
      ),
      (
        "return_url",
        format!("{}?onboarding_return=true", self.onboarding_return_base),
      ),
    ];

    let link: AccountLink = self.post_form("v1/account_links", &params, None).await?;
    Ok(link.url)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  fn processor_error(code: Option<&str>, decline: Option<&str>, param: Option<&str>) -> ProcessorError {
    ProcessorError {
      code: code.map(ToString::to_string),
      decline_code: decline.map(ToString::to_string),
      param: param.map(ToString::to_string),
      message: Some("boom".to_string()),
    }
  }

  #[test]
  fn maps_decline_codes() {
    assert_eq!(
      GatewayError::InsufficientFunds,
      map_processor_error(processor_error(Some("card_declined"), Some("insufficient_funds"), None))
    );
    assert_eq!(
      GatewayError::ActionRequired,
      map_processor_error(processor_error(Some("authentication_required"), None, None))
    );
    assert_eq!(
      GatewayError::DestinationAccountInvalid,
      map_processor_error(processor_error(Some("account_invalid"), None, None))
    );
    assert_eq!(
      GatewayError::DestinationAccountInvalid,
      map_processor_error(processor_error(None, None, Some("destination")))
    );
    assert_eq!(
      GatewayError::Permanent("boom".to_string()),
      map_processor_error(processor_error(Some("expired_card"), None, None))
    );
  }
}
