//! Domain models for the payment service.

pub mod currency;
pub mod money;
pub mod payment;
pub mod payment_method;
pub mod status;

pub use currency::{
    ConfirmationPolicy, CryptoCurrency, CurrencyRegistry, DEFAULT_REQUIRED_CONFIRMATIONS,
};
pub use money::FiatMoney;
pub use payment::{Payment, PaymentId, RECEIVED_AMOUNT_TOLERANCE};
pub use payment_method::PaymentMethod;
pub use status::{PaymentStatus, Transition};
