use crate::domain::donation::DonationStatus;
use crate::domain::gateway::{GatewayAdapter, GatewayEvent, Notification};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const PAYPAL_GATEWAY_ID: &str = "paypal";

const POSTBACK_TIMEOUT: Duration = Duration::from_secs(10);

/// The IPN "post-back": the raw message is echoed to PayPal, which answers
/// whether it sent it.
#[async_trait]
pub trait IpnPostback: Send + Sync {
    /// `Ok(true)` for VERIFIED, `Ok(false)` for INVALID.
    async fn validate(&self, raw: &[u8]) -> Result<bool, VerificationError>;
}

/// Post-back against PayPal's `cmd=_notify-validate` endpoint.
pub struct HttpIpnPostback {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpIpnPostback {
    pub fn new(endpoint: Url) -> Result<Self, VerificationError> {
        let client = reqwest::Client::builder()
            .timeout(POSTBACK_TIMEOUT)
            .build()
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl IpnPostback for HttpIpnPostback {
    async fn validate(&self, raw: &[u8]) -> Result<bool, VerificationError> {
        let mut body = b"cmd=_notify-validate&".to_vec();
        body.extend_from_slice(raw);

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("content-type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VerificationError::Transport(format!(
                "post-back answered {status}"
            )));
        }
        let text = response
            .text()
            .await
            .map_err(|e| VerificationError::Transport(e.to_string()))?;
        match text.trim() {
            "VERIFIED" => Ok(true),
            "INVALID" => Ok(false),
            other => Err(VerificationError::Transport(format!(
                "unexpected post-back answer: {other}"
            ))),
        }
    }
}

/// PayPal Instant Payment Notification adapter.
///
/// The donation reference travels in `invoice` (or `custom` for older
/// buttons). Without a post-back only the receiver address is checked.
pub struct PayPalAdapter {
    receiver_email: String,
    postback: Option<Arc<dyn IpnPostback>>,
}

impl PayPalAdapter {
    pub fn new(receiver_email: impl Into<String>) -> Self {
        Self {
            receiver_email: receiver_email.into(),
            postback: None,
        }
    }

    pub fn with_postback(mut self, postback: Arc<dyn IpnPostback>) -> Self {
        self.postback = Some(postback);
        self
    }
}

fn map_payment_status(raw: &str) -> Result<DonationStatus, GatewayError> {
    match raw {
        "Completed" => Ok(DonationStatus::Completed),
        "Denied" | "Failed" | "Expired" | "Voided" => Ok(DonationStatus::Failed),
        "Refunded" | "Reversed" => Ok(DonationStatus::Refunded),
        _ => Err(GatewayError::UnmappableStatus(raw.to_string())),
    }
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    fields
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl GatewayAdapter for PayPalAdapter {
    fn id(&self) -> &str {
        PAYPAL_GATEWAY_ID
    }

    async fn verify_notification(
        &self,
        notification: &Notification,
    ) -> Result<GatewayEvent, GatewayError> {
        let fields: HashMap<String, String> = url::form_urlencoded::parse(&notification.body)
            .into_owned()
            .collect();

        let receiver = field(&fields, "receiver_email").unwrap_or_default();
        if !receiver.eq_ignore_ascii_case(&self.receiver_email) {
            return Err(VerificationError::ReceiverMismatch(receiver.to_string()).into());
        }

        if let Some(postback) = &self.postback
            && !postback.validate(&notification.body).await?
        {
            return Err(VerificationError::PostbackRejected.into());
        }

        let payment_status = field(&fields, "payment_status").ok_or_else(|| {
            VerificationError::MalformedPayload("missing payment_status".into())
        })?;
        let reported_status = map_payment_status(payment_status)?;

        let reference = field(&fields, "invoice")
            .or_else(|| field(&fields, "custom"))
            .ok_or_else(|| VerificationError::MalformedPayload("missing invoice".into()))?;

        let idempotency_key = match field(&fields, "ipn_track_id") {
            Some(track) => track.to_string(),
            None => {
                let txn = field(&fields, "txn_id").ok_or_else(|| {
                    VerificationError::MalformedPayload("missing txn_id".into())
                })?;
                format!("{txn}:{payment_status}")
            }
        };

        let note = field(&fields, "reason_code")
            .or_else(|| field(&fields, "pending_reason"))
            .map(|reason| format!("paypal {payment_status}: {reason}"));

        Ok(GatewayEvent {
            donation_reference: reference.to_string(),
            reported_status,
            idempotency_key,
            note,
        })
    }
}
