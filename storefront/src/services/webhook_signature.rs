// storefront/src/services/webhook_signature.rs

//! Stripe-style webhook signatures: header `t=<unix seconds>,v1=<hex>` where
//! each `v1` is HMAC-SHA256 of `"<t>.<raw body>"` under the endpoint secret.

use crate::errors::{AppError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256> {
  let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
    .map_err(|e| AppError::Config(format!("Unusable webhook secret: {}", e)))?;
  mac.update(timestamp.to_string().as_bytes());
  mac.update(b".");
  mac.update(payload);
  Ok(mac)
}

/// Hex signature for `payload` at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
  Ok(hex::encode(mac_for(secret, timestamp, payload)?.finalize().into_bytes()))
}

/// A complete header value, as the provider would send it.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String> {
  Ok(format!("t={},v1={}", timestamp, compute_signature(secret, timestamp, payload)?))
}

/// Checks `header` against `payload`. Any `v1` entry may match (the provider
/// sends several while a secret is being rolled). Comparison is constant
/// time.
pub fn verify(header: &str, payload: &[u8], secret: &str, now_unix: i64, tolerance_secs: i64) -> Result<()> {
  let invalid = || AppError::Signature("Invalid signature".to_string());

  let mut timestamp: Option<i64> = None;
  let mut candidates: Vec<Vec<u8>> = Vec::new();
  for part in header.split(',') {
    let Some((key, value)) = part.trim().split_once('=') else {
      continue;
    };
    match key {
      "t" => timestamp = value.parse().ok(),
      "v1" => {
        if let Ok(bytes) = hex::decode(value) {
          candidates.push(bytes);
        }
      }
      _ => {}
    }
  }

  let timestamp = timestamp.ok_or_else(invalid)?;
  if candidates.is_empty() {
    return Err(invalid());
  }
  if tolerance_secs > 0 && now_unix.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
    return Err(invalid());
  }

  let base = mac_for(secret, timestamp, payload)?;
  let matched = candidates.iter().any(|candidate| base.clone().verify_slice(candidate).is_ok());
  if matched {
    Ok(())
  } else {
    Err(invalid())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SECRET: &str = "whsec_test_secret";
  const NOW: i64 = 1_767_000_000;

  #[test]
  fn accepts_fresh_valid_signature() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = signature_header(SECRET, NOW - 10, payload).unwrap();
    assert!(verify(&header, payload, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
  }

  #[test]
  fn rejects_tampered_payload_and_wrong_secret() {
    let payload = br#"{"id":"evt_1"}"#;
    let header = signature_header(SECRET, NOW, payload).unwrap();
    assert!(verify(&header, br#"{"id":"evt_2"}"#, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
    assert!(verify(&header, payload, "whsec_other", NOW, DEFAULT_TOLERANCE_SECS).is_err());
  }

  #[test]
  fn rejects_stale_timestamp() {
    let payload = b"{}";
    let header = signature_header(SECRET, NOW - 600, payload).unwrap();
    assert!(verify(&header, payload, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_err());
  }

  #[test]
  fn any_v1_entry_may_match() {
    let payload = b"{}";
    let good = compute_signature(SECRET, NOW, payload).unwrap();
    let header = format!("t={},v1={},v1={}", NOW, "00".repeat(32), good);
    assert!(verify(&header, payload, SECRET, NOW, DEFAULT_TOLERANCE_SECS).is_ok());
  }

  #[test]
  fn extreme_timestamps_are_stale() {
    for t in [i64::MIN, i64::MAX] {
      let header = format!("t={},v1={}", t, "00".repeat(32));
      let err = verify(&header, b"{}", SECRET, NOW, DEFAULT_TOLERANCE_SECS).unwrap_err();
      assert!(matches!(err, AppError::Signature(m) if m == "Invalid signature"));
    }
  }

  #[test]
  fn garbage_headers_are_invalid() {
    let timestamp_only = format!("t={}", NOW);
    for header in ["", "garbage", "t=abc,v1=00", timestamp_only.as_str(), "v1=zz"] {
      let err = verify(header, b"{}", SECRET, NOW, DEFAULT_TOLERANCE_SECS).unwrap_err();
      assert!(matches!(err, AppError::Signature(m) if m == "Invalid signature"));
    }
  }
}
