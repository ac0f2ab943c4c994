use bigdecimal::BigDecimal;
use loadhaul_db_schema::{newtypes::PersonId, source::job::Job};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
  pub cargo_description: String,
  pub origin_address: String,
  pub destination_address: String,
  pub destination_lat: Option<f64>,
  pub destination_lng: Option<f64>,
  /// Supplier-facing price in major units.
  pub price: BigDecimal,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobResponse {
  pub job: Job,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListJobsResponse {
  pub jobs: Vec<Job>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeJobPaymentRequest {
  /// Processor reference of the supplier's payment method.
  pub payment_method_ref: String,
  /// The hauler being assigned to the job.
  pub hauler_person_id: PersonId,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeStatus {
  Authorized,
  /// The payer's bank wants an extra step; the caller completes it with the
  /// action token and authorizes again.
  RequiresAction,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeJobPaymentResponse {
  pub status: AuthorizeStatus,
  pub action_token: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofRequest {
  /// Raw signed-image encoding of the receiver's acknowledgment.
  pub signature_data: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  pub photo_url: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProofResponse {
  pub accepted: bool,
  /// Great-circle distance from the job destination, when both coordinates
  /// were available. Advisory; a large value never blocked acceptance.
  pub distance_deviation_m: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PayoutAccountResponse {
  pub account_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OnboardingLinkResponse {
  pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SuccessResponse {
  pub success: bool,
}

impl Default for SuccessResponse {
  fn default() -> Self {
    SuccessResponse { success: true }
  }
}
