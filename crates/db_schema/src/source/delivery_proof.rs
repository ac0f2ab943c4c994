use crate::newtypes::{DeliveryProofId, JobId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
#[cfg(feature = "full")]
use {
  diesel::prelude::*,
  loadhaul_db_schema_file::schema::delivery_proof,
};

#[skip_serializing_none]
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[cfg_attr(
  feature = "full",
  derive(diesel::Queryable, diesel::Selectable, diesel::Identifiable)
)]
#[cfg_attr(feature = "full", diesel(table_name = delivery_proof))]
#[cfg_attr(feature = "full", diesel(primary_key(id)))]
#[cfg_attr(feature = "full", diesel(check_for_backend(diesel::pg::Pg)))]
#[serde(rename_all = "camelCase")]
/// Signed evidence of physical delivery. At most one per job, first write
/// wins; a later proof for a job that already has one is rejected outright,
/// never merged or overwritten.
pub struct DeliveryProof {
  pub id: DeliveryProofId,
  pub job_id: JobId,
  /// Raw signed-image encoding. Empty is treated as absent: a proof without a
  /// signature never gates a payout.
  pub signature_data: String,
  pub latitude: Option<f64>,
  pub longitude: Option<f64>,
  /// Great-circle distance from the job destination, kept for audit. Advisory
  /// only; a large deviation does not block payout.
  pub distance_deviation_m: Option<f64>,
  pub photo_url: Option<String>,
  pub captured_at: DateTime<Utc>,
}

impl DeliveryProof {
  /// The emptiness rule shared by proof submission and the capture guard, so
  /// the two checks can never drift apart.
  pub fn has_signature(&self) -> bool {
    !self.signature_data.trim().is_empty()
  }
}

#[derive(Debug, Clone, derive_new::new, Serialize, Deserialize)]
#[cfg_attr(feature = "full", derive(Insertable))]
#[cfg_attr(feature = "full", diesel(table_name = delivery_proof))]
pub struct DeliveryProofInsertForm {
  pub job_id: JobId,
  pub signature_data: String,
  #[new(default)]
  pub latitude: Option<f64>,
  #[new(default)]
  pub longitude: Option<f64>,
  #[new(default)]
  pub distance_deviation_m: Option<f64>,
  #[new(default)]
  pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn proof(signature_data: &str) -> DeliveryProof {
    DeliveryProof {
      id: DeliveryProofId(1),
      job_id: JobId(1),
      signature_data: signature_data.to_string(),
      latitude: None,
      longitude: None,
      distance_deviation_m: None,
      photo_url: None,
      captured_at: Utc::now(),
    }
  }

  #[test]
  fn empty_signature_counts_as_absent() {
    assert!(proof("data:image/png;base64,iVBOR").has_signature());
    assert!(!proof("").has_signature());
    assert!(!proof("   ").has_signature());
  }
}
