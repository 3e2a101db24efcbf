use crate::domain::donation::DonationStatus;
use crate::domain::gateway::{GatewayAdapter, GatewayEvent, Notification};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;

pub const STRIPE_GATEWAY_ID: &str = "stripe";
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Metadata key the checkout session carries the donation reference in.
pub const REFERENCE_METADATA_KEY: &str = "donation_reference";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct StripeEvent {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    data: EventData,
}

#[derive(Debug, Deserialize)]
struct EventData {
    object: EventObject,
}

#[derive(Debug, Deserialize)]
struct EventObject {
    #[serde(default)]
    metadata: HashMap<String, String>,
    /// Set on checkout sessions; `unpaid` until delayed payment methods settle.
    #[serde(default)]
    payment_status: Option<String>,
}

/// Stripe webhook adapter: the body is only trusted once the
/// `stripe-signature` HMAC matches and its timestamp is within tolerance.
pub struct StripeAdapter {
    secret: String,
    tolerance_secs: i64,
}

impl StripeAdapter {
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    fn verify_signature(
        &self,
        header: &str,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> Result<(), VerificationError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| VerificationError::InvalidSignatureFormat)?,
                    );
                }
                Some(("v1", value)) => {
                    signatures.push(
                        hex::decode(value).map_err(|_| VerificationError::InvalidSignatureFormat)?,
                    );
                }
                // Other schemes (v0 test signatures) are ignored.
                Some(_) => {}
                None => return Err(VerificationError::InvalidSignatureFormat),
            }
        }
        let timestamp = timestamp.ok_or(VerificationError::InvalidSignatureFormat)?;
        if signatures.is_empty() {
            return Err(VerificationError::InvalidSignatureFormat);
        }

        let mac = signed_payload_mac(&self.secret, timestamp, body)?;
        if !signatures
            .iter()
            .any(|sig| mac.clone().verify_slice(sig).is_ok())
        {
            return Err(VerificationError::SignatureMismatch);
        }

        // Checked after the signature so an unsigned request learns nothing about the clock.
        let Some(age_secs) = now.timestamp().checked_sub(timestamp) else {
            return Err(VerificationError::StaleTimestamp { age_secs: i64::MAX });
        };
        let tolerance = u64::try_from(self.tolerance_secs).unwrap_or(0);
        if age_secs.unsigned_abs() > tolerance {
            return Err(VerificationError::StaleTimestamp { age_secs });
        }
        Ok(())
    }

    pub(crate) fn verify_at(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> Result<GatewayEvent, GatewayError> {
        let header = notification
            .header(SIGNATURE_HEADER)
            .ok_or(VerificationError::MissingSignature)?;
        self.verify_signature(header, &notification.body, now)?;

        let event: StripeEvent = serde_json::from_slice(&notification.body)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        let reported_status = match event.kind.as_str() {
            "checkout.session.completed" => match event.data.object.payment_status.as_deref() {
                Some("paid" | "no_payment_required") => DonationStatus::Completed,
                other => {
                    return Err(GatewayError::UnmappableStatus(format!(
                        "checkout.session.completed with payment_status {}",
                        other.unwrap_or("missing")
                    )));
                }
            },
            "checkout.session.async_payment_succeeded" | "payment_intent.succeeded" => {
                DonationStatus::Completed
            }
            "payment_intent.payment_failed"
            | "checkout.session.async_payment_failed"
            | "checkout.session.expired" => DonationStatus::Failed,
            "charge.refunded" => DonationStatus::Refunded,
            other => return Err(GatewayError::UnmappableStatus(other.to_string())),
        };

        let reference = event
            .data
            .object
            .metadata
            .get(REFERENCE_METADATA_KEY)
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .ok_or_else(|| {
                VerificationError::MalformedPayload(format!("missing metadata.{REFERENCE_METADATA_KEY}"))
            })?;

        Ok(GatewayEvent {
            donation_reference: reference.to_string(),
            reported_status,
            note: Some(format!("stripe {}", event.kind)),
            idempotency_key: event.id,
        })
    }
}

fn signed_payload_mac(
    secret: &str,
    timestamp: i64,
    body: &[u8],
) -> Result<HmacSha256, VerificationError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| VerificationError::InvalidSignatureFormat)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(mac)
}

/// Builds a `stripe-signature` header value for `body`, as Stripe would.
pub fn signature_header(
    secret: &str,
    timestamp: i64,
    body: &[u8],
) -> Result<String, VerificationError> {
    let mac = signed_payload_mac(secret, timestamp, body)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

#[async_trait]
impl GatewayAdapter for StripeAdapter {
    fn id(&self) -> &str {
        STRIPE_GATEWAY_ID
    }

    async fn verify_notification(
        &self,
        notification: &Notification,
    ) -> Result<GatewayEvent, GatewayError> {
        self.verify_at(notification, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SECRET: &str = "whsec_test";

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn event(kind: &str, reference: &str) -> String {
        session_event(kind, reference, "paid")
    }

    fn session_event(kind: &str, reference: &str, payment_status: &str) -> String {
        format!(
            r#"{{"id":"evt_1","type":"{kind}","data":{{"object":{{"id":"cs_1","payment_status":"{payment_status}","metadata":{{"donation_reference":"{reference}"}}}}}}}}"#
        )
    }

    fn signed(body: &str, timestamp: i64) -> Notification {
        let header = signature_header(SECRET, timestamp, body.as_bytes()).unwrap();
        Notification::new(body).with_header("Stripe-Signature", header)
    }

    #[test]
    fn test_valid_signature() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = event("checkout.session.completed", "DON-3-9");
        let result = adapter
            .verify_at(&signed(&body, now().timestamp() - 10), now())
            .unwrap();

        assert_eq!(result.donation_reference, "DON-3-9");
        assert_eq!(result.reported_status, DonationStatus::Completed);
        assert_eq!(result.idempotency_key, "evt_1");
    }

    #[test]
    fn test_event_mapping() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let ts = now().timestamp();
        for (kind, expected) in [
            ("payment_intent.succeeded", DonationStatus::Completed),
            ("checkout.session.async_payment_succeeded", DonationStatus::Completed),
            ("checkout.session.async_payment_failed", DonationStatus::Failed),
            ("payment_intent.payment_failed", DonationStatus::Failed),
            ("checkout.session.expired", DonationStatus::Failed),
            ("charge.refunded", DonationStatus::Refunded),
        ] {
            let result = adapter.verify_at(&signed(&event(kind, "R"), ts), now()).unwrap();
            assert_eq!(result.reported_status, expected, "{kind}");
        }
        assert!(matches!(
            adapter.verify_at(&signed(&event("customer.created", "R"), ts), now()),
            Err(GatewayError::UnmappableStatus(_))
        ));
    }

    #[test]
    fn test_tampered_body() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = event("checkout.session.completed", "DON-3-9");
        let header = signature_header(SECRET, now().timestamp(), body.as_bytes()).unwrap();
        let tampered = Notification::new(body.replace("DON-3-9", "DON-3-8"))
            .with_header(SIGNATURE_HEADER, header);

        assert!(matches!(
            adapter.verify_at(&tampered, now()),
            Err(GatewayError::Verification(VerificationError::SignatureMismatch))
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let adapter = StripeAdapter::new("whsec_other", 300);
        let body = event("checkout.session.completed", "R");
        assert!(matches!(
            adapter.verify_at(&signed(&body, now().timestamp()), now()),
            Err(GatewayError::Verification(VerificationError::SignatureMismatch))
        ));
    }

    #[test]
    fn test_stale_timestamp() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = event("checkout.session.completed", "R");
        assert!(matches!(
            adapter.verify_at(&signed(&body, now().timestamp() - 301), now()),
            Err(GatewayError::Verification(VerificationError::StaleTimestamp { age_secs: 301 }))
        ));
    }

    #[test]
    fn test_unsettled_checkout_session_is_not_completed() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let ts = now().timestamp();
        let unpaid = session_event("checkout.session.completed", "R", "unpaid");
        assert!(matches!(
            adapter.verify_at(&signed(&unpaid, ts), now()),
            Err(GatewayError::UnmappableStatus(ref s)) if s.contains("unpaid")
        ));

        let free = session_event("checkout.session.completed", "R", "no_payment_required");
        let result = adapter.verify_at(&signed(&free, ts), now()).unwrap();
        assert_eq!(result.reported_status, DonationStatus::Completed);
    }

    #[test]
    fn test_extreme_timestamp_is_stale() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = event("checkout.session.completed", "R");
        for timestamp in [i64::MIN, i64::MAX] {
            assert!(matches!(
                adapter.verify_at(&signed(&body, timestamp), now()),
                Err(GatewayError::Verification(VerificationError::StaleTimestamp { .. }))
            ));
        }
    }

    #[test]
    fn test_missing_or_malformed_header() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = event("checkout.session.completed", "R");
        assert!(matches!(
            adapter.verify_at(&Notification::new(body.clone()), now()),
            Err(GatewayError::Verification(VerificationError::MissingSignature))
        ));
        let garbled = Notification::new(body).with_header(SIGNATURE_HEADER, "t=abc,v1=zz");
        assert!(matches!(
            adapter.verify_at(&garbled, now()),
            Err(GatewayError::Verification(VerificationError::InvalidSignatureFormat))
        ));
    }

    #[test]
    fn test_missing_reference() {
        let adapter = StripeAdapter::new(SECRET, 300);
        let body = r#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#;
        assert!(matches!(
            adapter.verify_at(&signed(body, now().timestamp()), now()),
            Err(GatewayError::Verification(VerificationError::MalformedPayload(_)))
        ));
    }
}
