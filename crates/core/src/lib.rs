//! Ironic Gym Core - Shared types library.
//!
//! This crate provides the domain types used by the storefront:
//! products, cart lines, billing addresses, orders and the checkout
//! handoff record that bridges the redirect to the payment processor.
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no session
//! access, no HTTP clients. Cart arithmetic lives here so it can be tested
//! without a running server.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, emails, statuses, cart, address and order types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
