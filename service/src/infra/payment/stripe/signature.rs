//! Webhook signatures in `t={timestamp},v1={hex HMAC-SHA256}` format.
//!
//! The signed message is `{timestamp}.{raw body}`.

use std::time::Duration;

use common::DateTime;
use derive_more::{Display, Error};
use hmac::{Hmac, Mac as _};
use sha2::Sha256;

/// HMAC-SHA256 of a signed message.
type HmacSha256 = Hmac<Sha256>;

/// Error of a webhook signature verification.
#[derive(Clone, Copy, Debug, Display, Error, Eq, PartialEq)]
pub enum SignatureError {
    /// Signature header has no timestamp or no `v1` signature.
    #[display("malformed signature header")]
    MalformedHeader,

    /// None of the `v1` signatures matches the payload.
    #[display("signature mismatch")]
    Mismatch,

    /// Signature timestamp is outside of the tolerance.
    #[display("signature timestamp is outside of the tolerance")]
    Expired,
}

/// Verifies the provided signature `header` of the `payload` against the
/// `secret`, accepting timestamps within `tolerance` from `now`.
///
/// # Errors
///
/// If the `header` is malformed, or no signature matches, or the timestamp
/// is too far from `now`.
pub fn verify(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance: Duration,
    now: DateTime,
) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = vec![];
    let pairs = header.split(',').filter_map(|p| p.trim().split_once('='));
    for (key, value) in pairs {
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signatures.extend(hex::decode(value).ok()),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    let matches = signatures.iter().any(|sig| {
        mac(secret, timestamp, payload)
            .is_some_and(|m| m.verify_slice(sig).is_ok())
    });
    if !matches {
        return Err(SignatureError::Mismatch);
    }

    let age = now.unix_timestamp().abs_diff(timestamp);
    if age > tolerance.as_secs() {
        return Err(SignatureError::Expired);
    }
    Ok(())
}

/// Signs the provided `payload` with the `secret` at the `timestamp`,
/// returning the signature header value.
#[must_use]
pub fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let sig = mac(secret, timestamp, payload)
        .map(|m| hex::encode(m.finalize().into_bytes()))
        .unwrap_or_default();
    format!("t={timestamp},v1={sig}")
}

/// Feeds the signed message into a new [`HmacSha256`] keyed with the
/// `secret`.
fn mac(secret: &str, timestamp: i64, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

#[cfg(test)]
mod spec {
    use std::time::Duration;

    use common::DateTime;

    use super::{sign, verify, SignatureError};

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"id":"evt_1"}"#;
    const TOLERANCE: Duration = Duration::from_secs(300);

    fn at(timestamp: i64) -> DateTime {
        DateTime::from_unix_timestamp(timestamp).unwrap()
    }

    #[test]
    fn verifies_own_signature() {
        let header = sign(BODY, SECRET, 1_700_000_000);

        assert_eq!(
            verify(BODY, &header, SECRET, TOLERANCE, at(1_700_000_100)),
            Ok(()),
        );
    }

    #[test]
    fn accepts_any_of_multiple_signatures() {
        let good = sign(BODY, SECRET, 1_700_000_000);
        let (_, good_sig) = good.split_once(",v1=").unwrap();
        let header = format!("t=1700000000,v1=00ff,v1={good_sig}");

        assert_eq!(
            verify(BODY, &header, SECRET, TOLERANCE, at(1_700_000_000)),
            Ok(()),
        );
    }

    #[test]
    fn rejects_tampered_body() {
        let header = sign(BODY, SECRET, 1_700_000_000);

        assert_eq!(
            verify(
                br#"{"id":"evt_2"}"#,
                &header,
                SECRET,
                TOLERANCE,
                at(1_700_000_000),
            ),
            Err(SignatureError::Mismatch),
        );
        assert_eq!(
            verify(BODY, &header, "whsec_other", TOLERANCE, at(1_700_000_000)),
            Err(SignatureError::Mismatch),
        );
    }

    #[test]
    fn rejects_stale_timestamp() {
        let header = sign(BODY, SECRET, 1_700_000_000);

        assert_eq!(
            verify(BODY, &header, SECRET, TOLERANCE, at(1_700_000_301)),
            Err(SignatureError::Expired),
        );
    }

    #[test]
    fn rejects_malformed_header() {
        for header in ["", "t=abc,v1=00", "v1=00", "t=1700000000"] {
            assert_eq!(
                verify(BODY, header, SECRET, TOLERANCE, at(1_700_000_000)),
                Err(SignatureError::MalformedHeader),
                "{header}",
            );
        }
    }
}
