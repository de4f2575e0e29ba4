//! # Payments Types
//!
//! Domain types and port traits for the crypto payment service.
//! This crate has ZERO external IO dependencies - only data structures,
//! business rules, and trait definitions. Nothing in here logs or reads
//! the clock; callers pass `now` in.
//!
//! ## Architecture
//!
//! This crate represents the **innermost core** of the hexagonal architecture:
//! - `domain/` - Currency registry, payment method, status table, Payment aggregate
//! - `events/` - Inbound blockchain/provider facts
//! - `ports/` - Trait definitions that adapters must implement
//! - `dto/` - Data Transfer Objects for the service boundary
//! - `error/` - Domain and application error types

pub mod domain;
pub mod dto;
pub mod error;
pub mod events;
pub mod ports;

// Re-export commonly used types
pub use domain::{
    ConfirmationPolicy, CryptoCurrency, CurrencyRegistry, FiatMoney, Payment, PaymentId,
    PaymentMethod, PaymentStatus,
};
pub use dto::*;
pub use error::{AppError, ConfigError, ErrorKind, PaymentError, RepoError};
pub use events::PaymentEvent;
pub use ports::{
    ExchangeError, ExchangeRateProvider, OrderError, OrderPaymentPort, PaymentRepository,
    Versioned,
};
