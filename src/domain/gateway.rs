use super::donation::DonationStatus;
use crate::error::GatewayError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Gateway id used for transitions applied by an administrator.
pub const MANUAL_GATEWAY_ID: &str = "manual";

/// An inbound gateway notification as received by the transport layer.
///
/// Header names are stored lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub body: Vec<u8>,
    pub headers: BTreeMap<String, String>,
}

impl Notification {
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// A verified notification, normalised across gateways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    pub donation_reference: String,
    /// Always one of the state machine's targets: Completed, Failed or Refunded.
    pub reported_status: DonationStatus,
    pub idempotency_key: String,
    pub note: Option<String>,
}

/// Capability implemented once per payment gateway.
///
/// The dispatcher selects an adapter by `id()`, which must match the
/// `gateway_id` stored on donations the gateway produced. Verification may
/// involve a network round trip; its timeout policy belongs to the adapter.
#[async_trait]
pub trait GatewayAdapter: Send + Sync {
    fn id(&self) -> &str;

    async fn verify_notification(
        &self,
        notification: &Notification,
    ) -> Result<GatewayEvent, GatewayError>;
}

pub type GatewayAdapterRef = Arc<dyn GatewayAdapter>;

/// Maps a target status name reported by a gateway. `Pending` is not a target.
pub fn target_status(raw: &str) -> Result<DonationStatus, GatewayError> {
    match raw.parse::<DonationStatus>() {
        Ok(DonationStatus::Pending) | Err(_) => Err(GatewayError::UnmappableStatus(raw.to_string())),
        Ok(status) => Ok(status),
    }
}
