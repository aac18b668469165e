//! Billing/shipping address collected at checkout.

use serde::{Deserialize, Serialize};

use super::{Email, EmailError};

/// Reasons an [`AddressForm`] cannot be submitted.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// The billing form. Every field except `address_line2` is required.
///
/// The same shape is used for `PUT /api/users/me`, so the profile editor and
/// the billing form share one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl AddressForm {
    /// Check that every required field is filled in.
    ///
    /// Blank (whitespace-only) values count as missing. The first missing
    /// field in form order is reported.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::Missing`] naming the field, or
    /// [`AddressError::InvalidEmail`] when the email is malformed.
    pub fn validate(&self) -> Result<(), AddressError> {
        let required = [
            ("Full name", &self.name),
            ("Email", &self.email),
            ("Phone", &self.phone),
            ("Address line 1", &self.address_line1),
            ("City", &self.city),
            ("Postal code", &self.postal_code),
            ("Country", &self.country),
        ];
        if let Some((label, _)) = required
            .into_iter()
            .find(|(_, value)| value.trim().is_empty())
        {
            return Err(AddressError::Missing(label));
        }
        Email::parse(&self.email)?;
        Ok(())
    }

    /// Normalize an empty second address line to `None`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self
            .address_line2
            .as_deref()
            .is_some_and(|line| line.trim().is_empty())
        {
            self.address_line2 = None;
        }
        self
    }
}
