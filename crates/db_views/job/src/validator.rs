use crate::api::CreateJobRequest;
use bigdecimal::BigDecimal;
use loadhaul_utils::error::{LoadhaulError, LoadhaulErrorType};

fn require_non_empty(value: &str, field: &str) -> Result<(), LoadhaulError> {
  if value.trim().is_empty() {
    return Err(LoadhaulErrorType::InvalidField(format!("{field} is required")).into());
  }
  Ok(())
}

fn validate_coordinates(lat: Option<f64>, lng: Option<f64>) -> Result<(), LoadhaulError> {
  if let Some(lat) = lat {
    if !(-90.0..=90.0).contains(&lat) {
      return Err(LoadhaulErrorType::InvalidField("destinationLat out of range".to_string()).into());
    }
  }
  if let Some(lng) = lng {
    if !(-180.0..=180.0).contains(&lng) {
      return Err(LoadhaulErrorType::InvalidField("destinationLng out of range".to_string()).into());
    }
  }
  // A half-specified destination can't be used by the geofence check.
  if lat.is_some() != lng.is_some() {
    return Err(
      LoadhaulErrorType::InvalidField(
        "destinationLat and destinationLng must be supplied together".to_string(),
      )
      .into(),
    );
  }
  Ok(())
}

/// A job-creation request that passed field validation.
#[derive(Debug, Clone)]
pub struct ValidCreateJobRequest(pub CreateJobRequest);

impl TryFrom<CreateJobRequest> for ValidCreateJobRequest {
  type Error = LoadhaulError;

  fn try_from(value: CreateJobRequest) -> Result<Self, Self::Error> {
    require_non_empty(&value.cargo_description, "cargoDescription")?;
    require_non_empty(&value.origin_address, "originAddress")?;
    require_non_empty(&value.destination_address, "destinationAddress")?;
    validate_coordinates(value.destination_lat, value.destination_lng)?;
    if value.price <= BigDecimal::from(0) {
      return Err(LoadhaulErrorType::NegativeAmount.into());
    }
    Ok(ValidCreateJobRequest(value))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn request() -> CreateJobRequest {
    CreateJobRequest {
      cargo_description: "20 pallets of maize".to_string(),
      origin_address: "Harare".to_string(),
      destination_address: "Bulawayo".to_string(),
      destination_lat: Some(-20.1367),
      destination_lng: Some(28.5818),
      price: BigDecimal::from(500),
    }
  }

  #[test]
  fn accepts_a_complete_request() {
    assert!(ValidCreateJobRequest::try_from(request()).is_ok());
  }

  #[test]
  fn rejects_blank_fields() {
    let mut blank = request();
    blank.cargo_description = "  ".to_string();
    assert!(ValidCreateJobRequest::try_from(blank).is_err());
  }

  #[test]
  fn rejects_non_positive_price() {
    let mut free = request();
    free.price = BigDecimal::from(0);
    assert!(ValidCreateJobRequest::try_from(free).is_err());
  }

  #[test]
  fn rejects_half_specified_destination() {
    let mut half = request();
    half.destination_lng = None;
    assert!(ValidCreateJobRequest::try_from(half).is_err());
  }

  #[test]
  fn rejects_out_of_range_coordinates() {
    let mut bad = request();
    bad.destination_lat = Some(123.0);
    assert!(ValidCreateJobRequest::try_from(bad).is_err());
  }
}
