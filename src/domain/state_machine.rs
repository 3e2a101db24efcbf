//! Donation status transitions.
//!
//! ```text
//! Pending ──> Completed ──> Refunded
//!    └──────> Failed
//! ```
//!
//! `Failed` and `Refunded` are terminal. Every other request, including a
//! repeat of the current status, is rejected so replayed or out-of-order
//! gateway notifications cannot move a donation backwards.

use super::donation::{Donation, DonationStatus};
use super::event_log::DonationEvent;
use crate::error::TransitionError;
use chrono::{DateTime, Utc};

/// Label recorded in the audit trail for a transition into `target`.
pub fn event_label(target: DonationStatus) -> &'static str {
    match target {
        DonationStatus::Completed => "Payment completed",
        DonationStatus::Failed => "Payment failed",
        DonationStatus::Refunded => "Donation refunded",
        DonationStatus::Pending => "Donation pending",
    }
}

/// Validates and applies a transition.
///
/// On success the donation carries the new status and `updated_at`, and the
/// returned event must be appended to the donation's log. On failure the
/// donation is left untouched.
pub fn apply_transition(
    donation: &mut Donation,
    target: DonationStatus,
    gateway_id: &str,
    note: Option<String>,
    occurred_at: DateTime<Utc>,
) -> Result<DonationEvent, TransitionError> {
    let from = donation.status;
    if !from.can_transition_to(target) {
        return Err(TransitionError::InvalidTransition { from, to: target });
    }

    donation.status = target;
    donation.updated_at = occurred_at;

    Ok(DonationEvent {
        donation_id: donation.id,
        event_label: event_label(target).to_string(),
        status: target,
        gateway: gateway_id.to_string(),
        note,
        occurred_at,
    })
}
