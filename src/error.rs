use crate::domain::donation::{DonationId, DonationStatus};
use crate::domain::money::Currency;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by the `Money` value object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0} (amounts must not be negative)")]
    InvalidAmount(Decimal),
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: Currency, right: Currency },
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),
}

/// Rejection of a requested status change.
///
/// Recoverable: it usually means a gateway replayed or reordered a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition {
        from: DonationStatus,
        to: DonationStatus,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("Missing signature header")]
    MissingSignature,
    #[error("Invalid signature format")]
    InvalidSignatureFormat,
    #[error("Signature verification failed")]
    SignatureMismatch,
    #[error("Notification timestamp outside tolerance ({age_secs}s)")]
    StaleTimestamp { age_secs: i64 },
    #[error("Notification addressed to unexpected receiver: {0}")]
    ReceiverMismatch(String),
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
    #[error("Gateway rejected the notification post-back")]
    PostbackRejected,
    #[error("Transport error while verifying notification: {0}")]
    Transport(String),
}

impl VerificationError {
    /// Whether the failure came from a transport hiccup rather than bad data.
    pub fn is_transient(&self) -> bool {
        matches!(self, VerificationError::Transport(_))
    }
}

/// Errors a `GatewayAdapter` reports while normalising a notification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error(transparent)]
    Verification(#[from] VerificationError),
    #[error("Unmappable gateway status: {0}")]
    UnmappableStatus(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = std::result::Result<T, StorageError>;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("Donation not found: {0}")]
    DonationNotFound(DonationId),
    #[error("Donation {0} already exists")]
    DuplicateDonation(DonationId),
    #[error("Reference {reference:?} on gateway {gateway} already belongs to donation {existing}")]
    DuplicateReference {
        gateway: String,
        reference: String,
        existing: DonationId,
    },
    #[error("Donation {0} kept changing underneath the transition")]
    ConcurrentUpdate(DonationId),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures surfaced by `Dispatcher::handle_notification`.
///
/// Each variant is distinct so the transport layer can pick a response code
/// (retry vs. drop) for the gateway.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Unknown gateway: {0}")]
    UnknownGateway(String),
    #[error("Verification failed: {0}")]
    Verification(VerificationError),
    #[error("Unmappable gateway status: {0}")]
    UnmappableStatus(String),
    #[error("No donation with reference {reference:?} for gateway {gateway}")]
    DonationNotFound { gateway: String, reference: String },
    #[error(transparent)]
    Lifecycle(LifecycleError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl DispatchError {
    pub const PUBLIC_MESSAGE: &'static str = "payment could not be completed";

    /// Only transient conditions are worth a retry. Missing donations, unknown
    /// gateways and unmappable statuses are data or configuration problems.
    pub fn is_retryable(&self) -> bool {
        match self {
            DispatchError::Verification(e) => e.is_transient(),
            DispatchError::Storage(_) => true,
            DispatchError::Lifecycle(LifecycleError::Storage(_))
            | DispatchError::Lifecycle(LifecycleError::ConcurrentUpdate(_)) => true,
            _ => false,
        }
    }

    /// Donor-facing text. Internal detail never crosses this boundary.
    pub fn public_message(&self) -> &'static str {
        Self::PUBLIC_MESSAGE
    }
}

impl From<GatewayError> for DispatchError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::Verification(e) => DispatchError::Verification(e),
            GatewayError::UnmappableStatus(status) => DispatchError::UnmappableStatus(status),
        }
    }
}

impl From<LifecycleError> for DispatchError {
    fn from(error: LifecycleError) -> Self {
        match error {
            LifecycleError::Storage(e) => DispatchError::Storage(e),
            other => DispatchError::Lifecycle(other),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

/// Crate-wide error used at the edges (CLI, readers, writers).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Money(#[from] MoneyError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Gateway setup failed: {0}")]
    GatewaySetup(#[from] VerificationError),
    #[error("Campaign not found: {0}")]
    CampaignNotFound(crate::domain::campaign::CampaignId),
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
