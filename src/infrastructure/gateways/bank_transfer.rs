use crate::domain::gateway::{GatewayAdapter, GatewayEvent, Notification, target_status};
use crate::error::{GatewayError, VerificationError};
use async_trait::async_trait;
use serde::Deserialize;

pub const BANK_TRANSFER_GATEWAY_ID: &str = "bank_transfer";

/// Body of the admin action that reconciles a received transfer.
#[derive(Debug, Deserialize)]
struct ReconciliationAction {
    reference: String,
    status: String,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    action_id: Option<String>,
}

/// Bank transfers have no webhook: an administrator matches the reference the
/// donor quoted on the transfer and reports the outcome. There is no signature
/// to check, so verification is limited to the payload shape.
#[derive(Debug, Default, Clone)]
pub struct BankTransferAdapter;

impl BankTransferAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GatewayAdapter for BankTransferAdapter {
    fn id(&self) -> &str {
        BANK_TRANSFER_GATEWAY_ID
    }

    async fn verify_notification(
        &self,
        notification: &Notification,
    ) -> Result<GatewayEvent, GatewayError> {
        let action: ReconciliationAction = serde_json::from_slice(&notification.body)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        let reference = action.reference.trim();
        if reference.is_empty() {
            return Err(VerificationError::MalformedPayload("empty reference".into()).into());
        }
        let reported_status = target_status(&action.status)?;

        let idempotency_key = action
            .action_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{reference}:{reported_status}"));

        Ok(GatewayEvent {
            donation_reference: reference.to_string(),
            reported_status,
            idempotency_key,
            note: action.note,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::donation::DonationStatus;

    #[tokio::test]
    async fn test_reconciliation_action() {
        let adapter = BankTransferAdapter::new();
        let event = adapter
            .verify_notification(&Notification::new(
                r#"{"reference":" DON-1-2 ","status":"completed","note":"seen on statement"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(event.donation_reference, "DON-1-2");
        assert_eq!(event.reported_status, DonationStatus::Completed);
        assert_eq!(event.idempotency_key, "DON-1-2:completed");
        assert_eq!(event.note.as_deref(), Some("seen on statement"));
    }

    #[tokio::test]
    async fn test_action_id_is_the_idempotency_key() {
        let event = BankTransferAdapter::new()
            .verify_notification(&Notification::new(
                r#"{"reference":"R","status":"failed","action_id":"act-7"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(event.idempotency_key, "act-7");
    }

    #[tokio::test]
    async fn test_rejects_bad_payloads() {
        let adapter = BankTransferAdapter::new();
        assert!(matches!(
            adapter
                .verify_notification(&Notification::new(r#"{"reference":"","status":"completed"}"#))
                .await,
            Err(GatewayError::Verification(VerificationError::MalformedPayload(_)))
        ));
        assert!(matches!(
            adapter
                .verify_notification(&Notification::new(r#"{"reference":"R","status":"pending"}"#))
                .await,
            Err(GatewayError::UnmappableStatus(_))
        ));
    }
}
