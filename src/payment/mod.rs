//! Online payment gateways.
pub mod vnpay;

pub use vnpay::{PaymentResponse, RefundOutcome, VnPay};
