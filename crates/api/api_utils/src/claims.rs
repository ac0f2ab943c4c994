use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use loadhaul_db_schema::newtypes::LocalUserId;
use loadhaul_utils::error::{LoadhaulErrorExt, LoadhaulErrorType, LoadhaulResult};
use serde::{Deserialize, Serialize};

const TOKEN_LIFETIME_DAYS: i64 = 7;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
  /// local_user_id, standard claim by RFC 7519.
  pub sub: String,
  pub iss: String,
  /// Unix timestamp in seconds.
  pub iat: i64,
  pub exp: i64,
}

impl Claims {
  /// Decode and verify a bearer token against the configured secret. Session
  /// revocation belongs to the identity system; a token is good until it
  /// expires.
  pub fn validate(jwt: &str, jwt_secret: &str) -> LoadhaulResult<LocalUserId> {
    let key = DecodingKey::from_secret(jwt_secret.as_ref());
    let claims = decode::<Claims>(jwt, &key, &Validation::default())
      .with_loadhaul_type(LoadhaulErrorType::NotLoggedIn)?;
    let user_id = claims
      .claims
      .sub
      .parse()
      .with_loadhaul_type(LoadhaulErrorType::NotLoggedIn)?;
    Ok(LocalUserId(user_id))
  }

  pub fn generate(
    user_id: LocalUserId,
    jwt_secret: &str,
    hostname: &str,
  ) -> LoadhaulResult<String> {
    let now = Utc::now();
    let claims = Claims {
      sub: user_id.0.to_string(),
      iss: hostname.to_string(),
      iat: now.timestamp(),
      exp: (now + TimeDelta::days(TOKEN_LIFETIME_DAYS)).timestamp(),
    };
    let key = EncodingKey::from_secret(jwt_secret.as_ref());
    Ok(encode(&Header::default(), &claims, &key)?)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  const SECRET: &str = "jwt-test-secret";

  #[test]
  fn round_trips() {
    let jwt = Claims::generate(LocalUserId(42), SECRET, "localhost:8536").expect("generates");
    let user_id = Claims::validate(&jwt, SECRET).expect("validates");
    assert_eq!(LocalUserId(42), user_id);
  }

  #[test]
  fn rejects_wrong_secret() {
    let jwt = Claims::generate(LocalUserId(42), SECRET, "localhost:8536").expect("generates");
    let err = Claims::validate(&jwt, "other-secret").expect_err("must fail");
    assert_eq!(LoadhaulErrorType::NotLoggedIn, err.error_type);
  }

  #[test]
  fn rejects_expired_token() {
    let stale = Claims {
      sub: "42".to_string(),
      iss: "localhost:8536".to_string(),
      iat: 1_600_000_000,
      exp: 1_600_000_001,
    };
    let jwt = encode(
      &Header::default(),
      &stale,
      &EncodingKey::from_secret(SECRET.as_ref()),
    )
    .expect("encodes");
    assert!(Claims::validate(&jwt, SECRET).is_err());
  }

  #[test]
  fn rejects_garbage() {
    assert!(Claims::validate("not-a-jwt", SECRET).is_err());
  }
}
