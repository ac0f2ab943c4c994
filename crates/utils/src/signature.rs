use crate::error::{LoadhaulErrorType, LoadhaulResult};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// How far a signed timestamp may drift from the server clock before the
/// signature is rejected as a replay.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

/// Sign a raw webhook payload the way the processor does: an HMAC-SHA256 over
/// `"{timestamp}.{body}"` presented as `t=<timestamp>,v1=<hex>`.
///
/// Used by tests and local tooling to fabricate deliverable events.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> LoadhaulResult<String> {
  let digest = signed_digest(secret, timestamp, body)?;
  Ok(format!("t={timestamp},v1={}", hex::encode(digest)))
}

/// Verify a processor signature header against the untouched body bytes.
///
/// Verification happens on the raw byte stream before any JSON parsing; parsing
/// first and re-serializing would make the signature meaningless. Comparison is
/// constant-time. Multiple `v1` entries are accepted (the processor sends more
/// than one during secret rotation); any one match passes.
pub fn verify_signature(
  secret: &str,
  header: &str,
  body: &[u8],
  now: i64,
) -> LoadhaulResult<()> {
  let parsed = parse_signature_header(header)?;

  if (now - parsed.timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
    return Err(LoadhaulErrorType::WebhookSignatureInvalid.into());
  }

  let expected = signed_digest(secret, parsed.timestamp, body)?;
  let matched = parsed
    .signatures
    .iter()
    .fold(0u8, |acc, candidate| {
      acc | expected[..].ct_eq(&candidate[..]).unwrap_u8()
    });
  if matched == 1 {
    Ok(())
  } else {
    Err(LoadhaulErrorType::WebhookSignatureInvalid.into())
  }
}

struct ParsedSignatureHeader {
  timestamp: i64,
  signatures: Vec<[u8; 32]>,
}

fn parse_signature_header(header: &str) -> LoadhaulResult<ParsedSignatureHeader> {
  let mut timestamp = None;
  let mut signatures = Vec::new();

  for part in header.split(',') {
    let Some((key, value)) = part.trim().split_once('=') else {
      continue;
    };
    match key {
      "t" => timestamp = value.parse::<i64>().ok(),
      "v1" => {
        let mut digest = [0u8; 32];
        if hex::decode_to_slice(value, &mut digest).is_ok() {
          signatures.push(digest);
        }
      }
      _ => {}
    }
  }

  match (timestamp, signatures.is_empty()) {
    (Some(timestamp), false) => Ok(ParsedSignatureHeader {
      timestamp,
      signatures,
    }),
    _ => Err(LoadhaulErrorType::WebhookSignatureInvalid.into()),
  }
}

fn signed_digest(secret: &str, timestamp: i64, body: &[u8]) -> LoadhaulResult<[u8; 32]> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())?;
  mac.update(timestamp.to_string().as_bytes());
  mac.update(b".");
  mac.update(body);
  Ok(mac.finalize().into_bytes().into())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::LoadhaulErrorType;

  const SECRET: &str = "whsec_test";
  const BODY: &[u8] = br#"{"type":"account.updated","data":{"object":{"id":"acct_1"}}}"#;

  #[test]
  fn accepts_valid_signature() {
    let header = sign_payload(SECRET, 1_700_000_000, BODY).expect("signs");
    verify_signature(SECRET, &header, BODY, 1_700_000_010).expect("valid signature");
  }

  #[test]
  fn rejects_tampered_body() {
    let header = sign_payload(SECRET, 1_700_000_000, BODY).expect("signs");
    let tampered = br#"{"type":"account.updated","data":{"object":{"id":"acct_2"}}}"#;
    let err = verify_signature(SECRET, &header, tampered, 1_700_000_010)
      .expect_err("tampered body must fail");
    assert_eq!(LoadhaulErrorType::WebhookSignatureInvalid, err.error_type);
  }

  #[test]
  fn rejects_wrong_secret() {
    let header = sign_payload("whsec_other", 1_700_000_000, BODY).expect("signs");
    assert!(verify_signature(SECRET, &header, BODY, 1_700_000_010).is_err());
  }

  #[test]
  fn rejects_stale_timestamp() {
    let header = sign_payload(SECRET, 1_700_000_000, BODY).expect("signs");
    let err = verify_signature(SECRET, &header, BODY, 1_700_000_000 + WEBHOOK_TOLERANCE_SECS + 1)
      .expect_err("stale timestamp must fail");
    assert_eq!(LoadhaulErrorType::WebhookSignatureInvalid, err.error_type);
  }

  #[test]
  fn rejects_malformed_header() {
    assert!(verify_signature(SECRET, "", BODY, 1_700_000_000).is_err());
    assert!(verify_signature(SECRET, "t=notanumber,v1=00", BODY, 1_700_000_000).is_err());
    assert!(verify_signature(SECRET, "v1=0011", BODY, 1_700_000_000).is_err());
  }

  #[test]
  fn accepts_rotated_secret_list() {
    let good = sign_payload(SECRET, 1_700_000_000, BODY).expect("signs");
    let stale_sig = sign_payload("whsec_old", 1_700_000_000, BODY).expect("signs");
    let stale_v1 = stale_sig.split_once(",v1=").map(|(_, v)| v).unwrap_or_default();
    let header = format!("{good},v1={stale_v1}");
    verify_signature(SECRET, &header, BODY, 1_700_000_010).expect("one matching v1 is enough");
  }
}
