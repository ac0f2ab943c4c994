/// Mean Earth radius in meters, spherical model.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Deviation beyond which a delivery location is surfaced to the hauler as an
/// override confirmation before submission. Advisory only: the server records
/// the deviation but never rejects a proof because of it.
pub const GEOFENCE_ADVISORY_M: f64 = 500.0;

/// Great-circle distance in meters between two WGS84 coordinates, haversine
/// on a spherical Earth.
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
  let phi1 = lat1.to_radians();
  let phi2 = lat2.to_radians();
  let d_phi = (lat2 - lat1).to_radians();
  let d_lambda = (lng2 - lng1).to_radians();

  let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
  let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
  EARTH_RADIUS_M * c
}

pub fn exceeds_geofence_advisory(deviation_m: f64) -> bool {
  deviation_m > GEOFENCE_ADVISORY_M
}

#[cfg(test)]
mod tests {
  use super::*;

  const HARARE: (f64, f64) = (-17.8216, 31.0492);
  const BULAWAYO: (f64, f64) = (-20.1367, 28.5818);

  #[test]
  fn known_city_pair() {
    let d = haversine_distance_m(HARARE.0, HARARE.1, BULAWAYO.0, BULAWAYO.1);
    assert!(
      (d - 365_500.0).abs() < 2_000.0,
      "Harare-Bulawayo should be ~365.5 km, got {d}"
    );
  }

  #[test]
  fn zero_distance() {
    assert_eq!(
      0.0,
      haversine_distance_m(HARARE.0, HARARE.1, HARARE.0, HARARE.1)
    );
  }

  #[test]
  fn advisory_threshold() {
    // ~111 m north: inside the advisory radius
    let near = haversine_distance_m(HARARE.0, HARARE.1, HARARE.0 + 0.001, HARARE.1);
    assert!(near < GEOFENCE_ADVISORY_M);
    assert!(!exceeds_geofence_advisory(near));

    // ~556 m north: outside it
    let far = haversine_distance_m(HARARE.0, HARARE.1, HARARE.0 + 0.005, HARARE.1);
    assert!(exceeds_geofence_advisory(far));
  }
}
