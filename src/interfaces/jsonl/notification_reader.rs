use crate::domain::donation::{DonationId, DonationStatus};
use crate::domain::gateway::{MANUAL_GATEWAY_ID, Notification};
use crate::error::{EngineError, Result};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::BufRead;

/// One line of the notifications file.
///
/// `body` is either a string, used byte for byte (required for signed
/// payloads), or any other JSON value, re-serialised compactly.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationRecord {
    pub gateway: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

#[derive(Debug, Deserialize)]
struct ManualBody {
    donation: u64,
    status: String,
    #[serde(default)]
    note: Option<String>,
}

/// A decoded inbound line: either a gateway notification or an
/// administrator override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundNotification {
    Gateway {
        gateway_id: String,
        notification: Notification,
    },
    Manual {
        donation_id: DonationId,
        status: DonationStatus,
        note: Option<String>,
    },
}

impl TryFrom<NotificationRecord> for InboundNotification {
    type Error = EngineError;

    fn try_from(record: NotificationRecord) -> Result<Self> {
        if record.gateway == MANUAL_GATEWAY_ID {
            let body: ManualBody = match record.body {
                Value::String(raw) => serde_json::from_str(&raw)?,
                other => serde_json::from_value(other)?,
            };
            let status = body
                .status
                .parse::<DonationStatus>()
                .map_err(EngineError::InvalidRecord)?;
            return Ok(InboundNotification::Manual {
                donation_id: DonationId(body.donation),
                status,
                note: body.note,
            });
        }

        let body = match record.body {
            Value::String(raw) => raw.into_bytes(),
            other => serde_json::to_vec(&other)?,
        };
        let notification = record
            .headers
            .into_iter()
            .fold(Notification::new(body), |n, (name, value)| {
                n.with_header(&name, value)
            });
        Ok(InboundNotification::Gateway {
            gateway_id: record.gateway,
            notification,
        })
    }
}

/// Reads inbound notifications from a JSON-lines source. Blank lines are
/// skipped; a malformed line yields an error for that line only.
pub struct NotificationReader<R: BufRead> {
    source: R,
}

impl<R: BufRead> NotificationReader<R> {
    pub fn new(source: R) -> Self {
        Self { source }
    }

    pub fn notifications(self) -> impl Iterator<Item = Result<InboundNotification>> {
        self.source
            .lines()
            .filter(|line| !matches!(line, Ok(l) if l.trim().is_empty()))
            .map(|line| {
                let record: NotificationRecord = serde_json::from_str(&line?)?;
                InboundNotification::try_from(record)
            })
    }
}
