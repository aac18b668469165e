//! Signed-in user profile as returned by the backend.

use serde::{Deserialize, Deserializer, Serialize};

use super::{AddressForm, UserId};

/// The backend's user document.
///
/// Stored verbatim in the visitor's session under the `user` key after
/// sign-in, and re-fetched from `GET /api/users/me` when fresh address data
/// matters (checkout).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(rename = "_id", alias = "id", skip_serializing_if = "Option::is_none")]
    pub id: Option<UserId>,
    #[serde(deserialize_with = "null_as_empty")]
    pub name: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub email: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub phone: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub address_line1: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub address_line2: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub city: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub postal_code: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub country: String,
    pub is_admin: bool,
}

/// The backend sends `null` for contact fields a user never filled in.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

impl UserProfile {
    /// Whether the profile carries enough address data to ship an order.
    #[must_use]
    pub fn has_complete_address(&self) -> bool {
        [
            &self.address_line1,
            &self.city,
            &self.postal_code,
            &self.country,
        ]
        .iter()
        .all(|field| !field.trim().is_empty())
    }

    /// Prefill for the billing form ("Use My Profile Address").
    #[must_use]
    pub fn to_address_form(&self) -> AddressForm {
        AddressForm {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address_line1: self.address_line1.clone(),
            address_line2: Some(self.address_line2.clone()),
            city: self.city.clone(),
            postal_code: self.postal_code.clone(),
            country: self.country.clone(),
        }
        .normalized()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_profile_deserializes() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Sam",
            "email": "sam@example.com",
            "isAdmin": true
        }))
        .unwrap();
        assert_eq!(profile.id, Some(UserId::new("u1")));
        assert!(profile.is_admin);
        assert!(!profile.has_complete_address());
    }

    #[test]
    fn test_null_fields_read_as_empty() {
        let profile: UserProfile = serde_json::from_value(serde_json::json!({
            "_id": "u1",
            "name": "Sam",
            "email": "sam@example.com",
            "phone": null,
            "addressLine1": "1 King St W",
            "addressLine2": null,
            "city": "Toronto",
            "postalCode": "M5H 1A1",
            "country": "Canada"
        }))
        .unwrap();
        assert_eq!(profile.address_line2, "");
        assert_eq!(profile.phone, "");
        assert!(profile.has_complete_address());
    }

    #[test]
    fn test_complete_address() {
        let profile = UserProfile {
            address_line1: "1 King St W".to_string(),
            city: "Toronto".to_string(),
            postal_code: "M5H 1A1".to_string(),
            country: "Canada".to_string(),
            ..UserProfile::default()
        };
        assert!(profile.has_complete_address());

        let form = profile.to_address_form();
        assert_eq!(form.city, "Toronto");
        assert_eq!(form.address_line2, None);
    }
}
