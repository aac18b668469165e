//! Checkout handoff.
//!
//! Turns the cart plus a billing address into a hosted payment session and
//! leaves a [`HandoffRecord`] in durable storage for the payment-return page
//! to turn into an order.
//!
//! The flow has two steps:
//!
//! 1. [`begin`] checks that the shopper can check out at all and returns the
//!    profile used to prefill the billing form.
//! 2. [`confirm`] validates the submitted address, opens the payment session
//!    and, only once that succeeded, writes the record and clears the cart.

use ironic_gym_core::{AddressError, AddressForm, Cart, CartLine, HandoffRecord, UserProfile};
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError};
use crate::cart::CartStore;
use crate::storage::{DurableStore, StorageError, keys};

/// Why checkout could not proceed. `Display` is the text shown to the shopper.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("You must be signed in to check out. Please sign in first.")]
    NotSignedIn,

    #[error("Your cart is empty.")]
    EmptyCart,

    #[error("Could not verify your profile. Please log in again.")]
    ProfileUnavailable(#[source] BackendError),

    #[error("Please complete your full address in your Profile before checking out.")]
    IncompleteProfile,

    #[error("{0}")]
    InvalidAddress(#[from] AddressError),

    #[error("{}", .0.user_message())]
    PaymentSession(#[source] BackendError),

    #[error("We couldn't save your checkout. Please try again.")]
    Storage(#[from] StorageError),
}

impl CheckoutError {
    /// Errors the shopper fixes by editing the billing form, which stays open.
    /// Everything else sends them back to the cart.
    #[must_use]
    pub const fn is_form_error(&self) -> bool {
        matches!(self, Self::InvalidAddress(_))
    }
}

/// Check the preconditions for showing the billing form.
///
/// In order: a token must be present, the cart must be non-empty, the profile
/// must load, and the profile must carry a complete address.
///
/// # Errors
///
/// Returns the first failed precondition.
#[instrument(skip_all, fields(lines = store.cart().lines().len()))]
pub async fn begin<S: DurableStore>(
    store: &CartStore<S>,
    backend: &BackendClient,
    token: Option<&SecretString>,
) -> Result<UserProfile, CheckoutError> {
    let token = token.ok_or(CheckoutError::NotSignedIn)?;
    if store.cart().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let profile = backend
        .get_profile(token)
        .await
        .map_err(CheckoutError::ProfileUnavailable)?;
    if !profile.has_complete_address() {
        return Err(CheckoutError::IncompleteProfile);
    }

    Ok(profile)
}

/// Open the payment session and hand off to the processor.
///
/// On success the handoff record is in storage, the cart is empty and the
/// returned URL is where the shopper should be redirected. On failure no
/// record is left behind and the stored cart is unchanged.
///
/// # Errors
///
/// Returns an error if the address is invalid, the cart is empty, the
/// payment session cannot be created, or the record cannot be stored.
#[instrument(skip_all, fields(lines = store.cart().lines().len()))]
pub async fn confirm<S: DurableStore>(
    store: &mut CartStore<S>,
    backend: &BackendClient,
    token: &SecretString,
    address: AddressForm,
) -> Result<String, CheckoutError> {
    address.validate()?;
    if store.cart().is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let session = backend
        .create_checkout_session(token, store.cart())
        .await
        .map_err(CheckoutError::PaymentSession)?;

    let record = HandoffRecord::from_cart(store.cart(), address);
    store.storage().insert(keys::ORDER_DATA, &record).await?;
    if let Err(e) = store.clear().await {
        // The shopper stays on the cart; no record may outlive that.
        if let Err(undo) = store.storage().remove(keys::ORDER_DATA).await {
            tracing::error!(error = %undo, "Could not withdraw handoff record");
        }
        return Err(e.into());
    }

    tracing::info!(
        idempotency_key = %record.idempotency_key,
        total = %record.total_price_cents,
        "Checkout handed off to payment processor"
    );

    Ok(session.url)
}

/// Undo a handoff after the shopper cancelled payment.
///
/// The record's lines are merged back into the cart (quantities add up
/// with anything added since) and the record is deleted, so a later visit
/// to the success page cannot create an order for it.
/// Returns whether anything was restored.
///
/// # Errors
///
/// Returns an error if storage cannot be updated.
#[instrument(skip_all)]
pub async fn restore_after_cancel<S: DurableStore>(
    store: &mut CartStore<S>,
) -> Result<bool, StorageError> {
    let record = match store.storage().get::<HandoffRecord>(keys::ORDER_DATA).await {
        Ok(Some(record)) => record,
        Ok(None) => return Ok(false),
        Err(StorageError::Decode { .. }) => {
            tracing::warn!("Discarding unreadable handoff record");
            store.storage().remove(keys::ORDER_DATA).await?;
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let cart = Cart::from_lines(
        store
            .cart()
            .lines()
            .iter()
            .cloned()
            .chain(record.cart.iter().map(CartLine::from)),
    );
    store.replace(cart).await?;
    store.storage().remove(keys::ORDER_DATA).await?;

    Ok(true)
}
