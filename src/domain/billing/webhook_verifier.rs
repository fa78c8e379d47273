//! Card provider webhook signature verification.
//!
//! HMAC-SHA256 over `"{t}." ++ raw body`, compared in constant time, with a
//! timestamp window to prevent replay. The body is never parsed here; the
//! only way to obtain an [`AuthenticatedPayload`] is to pass verification.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::lifecycle_event::Provider;
use super::webhook_errors::WebhookError;

/// Header carrying the card provider signature.
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Default maximum age for signed events (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Maximum allowed clock skew for future events (1 minute).
const MAX_CLOCK_SKEW_SECS: i64 = 60;

/// Raw webhook body whose signature has been checked.
#[derive(Debug, Clone)]
pub struct AuthenticatedPayload {
    provider: Provider,
    body: Vec<u8>,
}

impl AuthenticatedPayload {
    /// Only verifiers construct this.
    pub(crate) fn new(provider: Provider, body: Vec<u8>) -> Self {
        Self { provider, body }
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// Parsed components of the signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp when the signature was generated.
    pub timestamp: i64,
    /// Every `v1` signature present; secret rotation sends more than one.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>[,v1=<hex>...]`.
    ///
    /// Unknown keys (including legacy `v0`) are ignored.
    pub fn parse(header: &str) -> Result<Self, WebhookError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| WebhookError::ParseError("invalid header format".to_string()))?;

            match key {
                "t" => {
                    timestamp = Some(value.parse().map_err(|_| {
                        WebhookError::ParseError("invalid timestamp".to_string())
                    })?);
                }
                "v1" => {
                    v1_signatures.push(hex::decode(value).map_err(|_| {
                        WebhookError::ParseError("invalid v1 signature hex".to_string())
                    })?);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| WebhookError::ParseError("missing timestamp".to_string()))?;
        if v1_signatures.is_empty() {
            return Err(WebhookError::ParseError("missing v1 signature".to_string()));
        }

        Ok(SignatureHeader {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifier for card provider webhook signatures.
pub struct StripeWebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance_secs(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies `payload` against the signature header using the current time.
    ///
    /// # Errors
    ///
    /// - `ParseError` - header is malformed
    /// - `TimestampOutOfRange` - signature older than the tolerance
    /// - `InvalidTimestamp` - signature too far in the future
    /// - `InvalidSignature` - no `v1` signature matches
    pub fn verify(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<AuthenticatedPayload, WebhookError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Same as [`verify`](Self::verify) with an explicit clock.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<AuthenticatedPayload, WebhookError> {
        let header = SignatureHeader::parse(signature_header)?;
        self.validate_timestamp(header.timestamp, now)?;

        let expected = self.compute_signature(header.timestamp, payload)?;
        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(WebhookError::InvalidSignature);
        }

        Ok(AuthenticatedPayload::new(Provider::Card, payload.to_vec()))
    }

    /// Builds a header value for `payload`, as the provider would send it.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> Result<String, WebhookError> {
        let signature = self.compute_signature(timestamp, payload)?;
        Ok(format!("t={},v1={}", timestamp, hex::encode(signature)))
    }

    fn validate_timestamp(&self, timestamp: i64, now: i64) -> Result<(), WebhookError> {
        let age = now - timestamp;

        if age > self.tolerance_secs {
            return Err(WebhookError::TimestampOutOfRange);
        }
        if age < -MAX_CLOCK_SKEW_SECS {
            return Err(WebhookError::InvalidTimestamp);
        }

        Ok(())
    }

    fn compute_signature(&self, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|_| WebhookError::InvalidSignature)?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}

/// Constant-time comparison of two byte slices.
fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "whsec_test_secret_12345";
    const NOW: i64 = 1_705_276_800;

    fn verifier() -> StripeWebhookVerifier {
        StripeWebhookVerifier::new(SecretString::new(TEST_SECRET.to_string()))
    }

    // ══════════════════════════════════════════════════════════════
    // SignatureHeader Parsing Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn parse_header_with_v1_only() {
        let header = SignatureHeader::parse(&format!("t=1234567890,v1={}", "a".repeat(64))).unwrap();

        assert_eq!(header.timestamp, 1234567890);
        assert_eq!(header.v1_signatures.len(), 1);
        assert_eq!(header.v1_signatures[0].len(), 32);
    }

    #[test]
    fn parse_header_collects_every_v1() {
        let header = SignatureHeader::parse(&format!(
            "t=1,v1={},v1={},v0={}",
            "a".repeat(64),
            "b".repeat(64),
            "c".repeat(64)
        ))
        .unwrap();

        assert_eq!(header.v1_signatures.len(), 2);
    }

    #[test]
    fn parse_header_missing_timestamp_fails() {
        let result = SignatureHeader::parse(&format!("v1={}", "a".repeat(64)));
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_missing_v1_fails() {
        let result = SignatureHeader::parse("t=1234567890");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_invalid_hex_fails() {
        let result = SignatureHeader::parse("t=1234567890,v1=not_valid_hex");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    #[test]
    fn parse_header_no_equals_fails() {
        let result = SignatureHeader::parse("t1234567890");
        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }

    // ══════════════════════════════════════════════════════════════
    // Signature Verification Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_valid_signature_returns_exact_body() {
        let payload = br#"{"id":"evt_1","type":"invoice.payment_succeeded"}"#;
        let header = verifier().sign(NOW, payload).unwrap();

        let authenticated = verifier().verify_at(payload, &header, NOW).unwrap();

        assert_eq!(authenticated.body(), payload);
        assert_eq!(authenticated.provider(), Provider::Card);
    }

    #[test]
    fn verify_does_not_require_json_body() {
        let payload = b"not json at all \xff";
        let header = verifier().sign(NOW, payload).unwrap();

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn verify_accepts_any_matching_v1() {
        let payload = b"{}";
        let good = verifier().sign(NOW, payload).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1={},v1={}", NOW, "a".repeat(64), good_sig);

        assert!(verifier().verify_at(payload, &header, NOW).is_ok());
    }

    #[test]
    fn verify_invalid_signature_fails() {
        let header = format!("t={},v1={}", NOW, "a".repeat(64));
        let result = verifier().verify_at(b"{}", &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_wrong_secret_fails() {
        let payload = b"{}";
        let header = verifier().sign(NOW, payload).unwrap();
        let other = StripeWebhookVerifier::new(SecretString::new("wrong".to_string()));

        let result = other.verify_at(payload, &header, NOW);

        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_tampered_payload_fails() {
        let header = verifier().sign(NOW, br#"{"id":"evt_test"}"#).unwrap();
        let result = verifier().verify_at(br#"{"id":"evt_hacked"}"#, &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    #[test]
    fn verify_whitespace_change_fails() {
        let header = verifier().sign(NOW, br#"{"id":"evt_1"}"#).unwrap();
        let result = verifier().verify_at(br#"{ "id": "evt_1" }"#, &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidSignature)));
    }

    // ══════════════════════════════════════════════════════════════
    // Timestamp Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn verify_timestamp_at_boundary_succeeds() {
        let header = verifier().sign(NOW - 300, b"{}").unwrap();
        assert!(verifier().verify_at(b"{}", &header, NOW).is_ok());
    }

    #[test]
    fn verify_timestamp_just_past_boundary_fails() {
        let header = verifier().sign(NOW - 301, b"{}").unwrap();
        let result = verifier().verify_at(b"{}", &header, NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn verify_timestamp_from_future_with_skew_succeeds() {
        let header = verifier().sign(NOW + 30, b"{}").unwrap();
        assert!(verifier().verify_at(b"{}", &header, NOW).is_ok());
    }

    #[test]
    fn verify_timestamp_from_future_beyond_skew_fails() {
        let header = verifier().sign(NOW + 120, b"{}").unwrap();
        let result = verifier().verify_at(b"{}", &header, NOW);
        assert!(matches!(result, Err(WebhookError::InvalidTimestamp)));
    }

    #[test]
    fn custom_tolerance_is_honoured() {
        let strict = verifier().with_tolerance_secs(10);
        let header = strict.sign(NOW - 11, b"{}").unwrap();
        let result = strict.verify_at(b"{}", &header, NOW);
        assert!(matches!(result, Err(WebhookError::TimestampOutOfRange)));
    }

    #[test]
    fn verify_uses_wall_clock() {
        let now = chrono::Utc::now().timestamp();
        let header = verifier().sign(now, b"{}").unwrap();
        assert!(verifier().verify(b"{}", &header).is_ok());
    }
}
