//! Core types for the Ironic Gym storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod cart;
pub mod email;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod user;

pub use address::{AddressError, AddressForm};
pub use cart::{Cart, CartLine, CartProduct};
pub use email::{Email, EmailError};
pub use id::*;
pub use order::{HandoffRecord, Order, OrderCustomer, OrderLine};
pub use price::Cents;
pub use product::{Product, ProductCategory, ProductDraft};
pub use status::OrderStatus;
pub use user::UserProfile;
