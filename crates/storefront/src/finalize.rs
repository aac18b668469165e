//! Order finalization after a successful payment.
//!
//! When the processor sends the shopper back, the handoff record written at
//! checkout becomes an order. A [`FinalizationGuard`] makes sure that happens
//! at most once per page mount:
//!
//! - nothing happens until the shopper's auth state is known
//! - a signed-out shopper is told to sign in and the record is kept
//! - otherwise the latch flips before the first await, the record is read
//!   and deleted, and only then is the order submitted
//!
//! Failures are reported, never retried: the payment already went through,
//! and a retry could create the order twice.

use std::sync::atomic::{AtomicBool, Ordering};

use ironic_gym_core::{HandoffRecord, OrderId};
use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use crate::backend::{BackendClient, BackendError};
use crate::storage::{DurableStore, StorageError, keys};

/// Whether the shopper is signed in, as far as this page can tell.
#[derive(Debug, Clone)]
pub enum AuthState {
    /// Stored credentials have not been read yet (or could not be).
    Initializing,
    SignedOut,
    SignedIn(SecretString),
}

impl AuthState {
    /// Read the bearer token from storage.
    ///
    /// A storage failure leaves the state undetermined rather than signed
    /// out, so a transient error never looks like a logout.
    pub async fn resolve<S: DurableStore>(storage: &S) -> Self {
        match storage.get::<String>(keys::TOKEN).await {
            Ok(Some(token)) if !token.is_empty() => Self::SignedIn(SecretString::from(token)),
            Ok(_) => Self::SignedOut,
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored credentials");
                Self::Initializing
            }
        }
    }
}

/// Why finalization did not produce an order.
#[derive(Debug, Error)]
pub enum FinalizeError {
    #[error("You must be logged in to finalize an order.")]
    SignInRequired,

    /// No record to submit: already consumed, or never written.
    #[error("No pending order was found. Your order may already have been created.")]
    MissingRecord,

    /// The record could not be deleted, so it was not submitted.
    #[error("We couldn't access your saved order. Please contact support.")]
    Storage(#[source] StorageError),

    #[error(
        "Your payment was successful, but we couldn't create the receipt. Please contact support. ({})",
        .0.user_message()
    )]
    Backend(#[source] BackendError),
}

/// What one run of the guard did.
#[derive(Debug)]
pub enum GuardOutcome {
    /// Auth state unknown; nothing was touched. Run again once it resolves.
    Waiting,
    /// Signed out; the record is still in storage.
    Blocked(FinalizeError),
    /// This guard already ran; nothing was touched.
    AlreadyRan,
    /// The order was created.
    Created(OrderId),
    /// The attempt was made and failed. The latch stays flipped.
    Failed(FinalizeError),
}

/// One-shot latch around order creation.
///
/// Create one per mount of the payment-return page; re-renders of the same
/// mount share it.
#[derive(Debug, Default)]
pub struct FinalizationGuard {
    done: AtomicBool,
}

impl FinalizationGuard {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            done: AtomicBool::new(false),
        }
    }

    /// Whether an attempt has been made.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Attempt finalization.
    #[instrument(skip_all)]
    pub async fn run<S: DurableStore>(
        &self,
        auth: &AuthState,
        storage: &S,
        backend: &BackendClient,
    ) -> GuardOutcome {
        let token = match auth {
            AuthState::Initializing => return GuardOutcome::Waiting,
            AuthState::SignedOut => return GuardOutcome::Blocked(FinalizeError::SignInRequired),
            AuthState::SignedIn(token) => token,
        };

        // Flip before the first await so a concurrent run sees it.
        if self.done.swap(true, Ordering::AcqRel) {
            return GuardOutcome::AlreadyRan;
        }

        let record = match storage.get::<HandoffRecord>(keys::ORDER_DATA).await {
            Ok(Some(record)) => Some(record),
            Ok(None) => None,
            Err(StorageError::Decode { .. }) => {
                tracing::warn!("Unreadable handoff record treated as missing");
                None
            }
            Err(e) => return GuardOutcome::Failed(FinalizeError::Storage(e)),
        };

        // Delete before submitting: a reload must not find the record again.
        if let Err(e) = storage.remove(keys::ORDER_DATA).await {
            tracing::error!(error = %e, "Could not delete handoff record; order not submitted");
            return GuardOutcome::Failed(FinalizeError::Storage(e));
        }

        let Some(record) = record else {
            tracing::warn!("Payment return without a pending handoff record");
            return GuardOutcome::Failed(FinalizeError::MissingRecord);
        };

        match backend.create_order(token, &record).await {
            Ok(order) => {
                tracing::info!(
                    order_id = %order.id,
                    idempotency_key = %record.idempotency_key,
                    "Order created after payment"
                );
                GuardOutcome::Created(order.id)
            }
            Err(BackendError::AlreadySubmitted(key)) => {
                tracing::warn!(idempotency_key = %key, "Order already submitted by another request");
                GuardOutcome::Failed(FinalizeError::MissingRecord)
            }
            Err(e) => {
                let event_id = sentry::capture_error(&e);
                tracing::error!(
                    error = %e,
                    sentry_event_id = %event_id,
                    idempotency_key = %record.idempotency_key,
                    "Order creation failed after successful payment"
                );
                GuardOutcome::Failed(FinalizeError::Backend(e))
            }
        }
    }
}
