//! Storefront-side models.
//!
//! Domain types shared with the backend live in `ironic_gym_core`; this
//! module holds what only the storefront keeps (the signed-in identity).

pub mod session;

pub use session::CurrentUser;
