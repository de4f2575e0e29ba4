//! # Payments Hex
//!
//! Application service layer for the crypto payment service.
//!
//! ## Architecture
//!
//! - `service/` - Application service (orchestrates the payment aggregate)
//! - `locks/` - Per-payment and per-order write serialization
//!
//! The service is generic over its ports (`PaymentRepository`,
//! `ExchangeRateProvider`, `OrderPaymentPort`), allowing different adapters
//! to be injected.

pub mod locks;
pub mod service;


pub use locks::KeyedLocks;
pub use service::{DEFAULT_EXPIRY_MINUTES, MAX_WRITE_ATTEMPTS, PaymentService};
