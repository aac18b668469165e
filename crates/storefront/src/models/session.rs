//! Session-related types.
//!
//! The signed-in identity is two session entries: the backend's user
//! document under `user` and the bearer token under `token`.

use ironic_gym_core::UserProfile;
use secrecy::{ExposeSecret, SecretString};

use crate::backend::AuthSession;
use crate::storage::{DurableStore, StorageError, keys};

/// The signed-in shopper.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    /// Profile as of sign-in.
    pub profile: UserProfile,
    /// Bearer token for backend calls.
    pub token: SecretString,
}

impl CurrentUser {
    /// Read the current user from storage.
    ///
    /// A stored token is what makes a session signed in; a missing profile
    /// is tolerated.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be read.
    pub async fn load<S: DurableStore>(storage: &S) -> Result<Option<Self>, StorageError> {
        let Some(token) = storage
            .get::<String>(keys::TOKEN)
            .await?
            .filter(|t| !t.is_empty())
        else {
            return Ok(None);
        };
        let profile = storage
            .get::<UserProfile>(keys::USER)
            .await?
            .unwrap_or_default();

        Ok(Some(Self {
            profile,
            token: SecretString::from(token),
        }))
    }

    /// Persist a fresh sign-in.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub async fn save<S: DurableStore>(
        storage: &S,
        auth: &AuthSession,
    ) -> Result<Self, StorageError> {
        let mut profile = auth.user.clone();
        profile.is_admin |= auth.is_admin;

        storage.insert(keys::USER, &profile).await?;
        storage.insert(keys::TOKEN, &auth.token.expose_secret()).await?;

        Ok(Self {
            profile,
            token: auth.token.clone(),
        })
    }

    /// Forget the signed-in user. The cart is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub async fn clear<S: DurableStore>(storage: &S) -> Result<(), StorageError> {
        storage.remove(keys::USER).await?;
        storage.remove(keys::TOKEN).await
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.profile.is_admin
    }

    /// Name for the header, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.profile.name.trim().is_empty() {
            &self.profile.email
        } else {
            &self.profile.name
        }
    }
}
