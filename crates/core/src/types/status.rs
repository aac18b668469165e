//! Order fulfillment status.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Order status as tracked by the backend.
///
/// The variants are ordered along the fulfillment timeline; the JSON form
/// is the variant name (`"Received"`, `"Dispatched"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum OrderStatus {
    #[default]
    Received,
    Accepted,
    Dispatched,
    Completed,
}

impl OrderStatus {
    /// Every status in timeline order.
    pub const ALL: [Self; 4] = [
        Self::Received,
        Self::Accepted,
        Self::Dispatched,
        Self::Completed,
    ];

    /// Position on the fulfillment timeline, starting at 0.
    #[must_use]
    pub const fn timeline_index(self) -> usize {
        self as usize
    }

    /// The name the backend uses for this status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "Received",
            Self::Accepted => "Accepted",
            Self::Dispatched => "Dispatched",
            Self::Completed => "Completed",
        }
    }

    /// Whether an admin may record a delivery date for an order in this status.
    #[must_use]
    pub const fn accepts_delivery_date(self) -> bool {
        matches!(self, Self::Dispatched | Self::Completed)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}
