//! Concrete payment gateway adapters.

pub mod bank_transfer;
pub mod paypal;
pub mod stripe;
