//! # Payments Repository
//!
//! Concrete adapters for the payments service ports:
//! - `memory` - `PaymentRepository` with optimistic versioning
//! - `orders` - `OrderPaymentPort` backed by an in-memory order book

pub mod memory;
pub mod orders;

#[cfg(test)]
mod memory_tests;

pub use memory::InMemoryPaymentRepo;
pub use orders::InMemoryOrderBook;
