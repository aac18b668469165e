//! Cart lines and the pure cart operations.
//!
//! # Invariants
//!
//! - No two lines share a product id.
//! - Every line has `quantity >= 1`; a line that would reach zero is removed.
//! - `total_items` and `subtotal` are folds over the current lines, computed
//!   on every call.
//!
//! Line order is insertion order and only matters for display.

use serde::{Deserialize, Serialize};

use super::{Cents, Product, ProductId};

/// What a shopper adds to the cart: the product fields a line keeps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartProduct {
    pub id: ProductId,
    pub name: String,
    pub price_cents: Cents,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub brand: String,
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price_cents: product.price_cents,
            image_url: product.thumbnail_url().to_owned(),
            brand: product.brand.clone(),
        }
    }
}

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: ProductId,
    pub name: String,
    pub price_cents: Cents,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub brand: String,
}

impl CartLine {
    /// Price of the whole line.
    #[must_use]
    pub const fn line_total(&self) -> Cents {
        self.price_cents.times(self.quantity)
    }
}

/// The shopper's cart.
///
/// Serializes as a bare JSON array of lines. Deserializing goes through
/// [`Cart::from_lines`], so stored data that breaks an invariant is repaired
/// on load rather than trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CartLine>", into = "Vec<CartLine>")]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Build a cart from raw lines, dropping zero-quantity lines and merging
    /// duplicate ids into the first occurrence.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if line.quantity == 0 {
                continue;
            }
            match cart.lines.iter_mut().find(|l| l.id == line.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(line.quantity);
                }
                None => cart.lines.push(line),
            }
        }
        cart
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Look up the line for a product.
    #[must_use]
    pub fn line(&self, id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add one unit of a product.
    ///
    /// Increments the existing line for the product's id, or appends a new
    /// line with quantity 1. Returns the line's new quantity.
    pub fn add_item(&mut self, product: CartProduct) -> u32 {
        if let Some(line) = self.lines.iter_mut().find(|l| l.id == product.id) {
            line.quantity = line.quantity.saturating_add(1);
            return line.quantity;
        }

        self.lines.push(CartLine {
            id: product.id,
            name: product.name,
            price_cents: product.price_cents,
            quantity: 1,
            image_url: product.image_url,
            brand: product.brand,
        });
        1
    }

    /// Set a line's quantity. Anything below 1 removes the line.
    ///
    /// There is no upper bound; stock limits are enforced by the backend.
    /// Returns `true` if a line with that id existed.
    pub fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        if quantity < 1 {
            return self.remove_item(id);
        }

        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.lines.iter_mut().find(|l| &l.id == id) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove a line. Returns `true` if a line with that id existed.
    pub fn remove_item(&mut self, id: &ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| &l.id != id);
        self.lines.len() != before
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of quantities across lines.
    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }

    /// Sum of `price * quantity` across lines.
    #[must_use]
    pub fn subtotal(&self) -> Cents {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

impl From<Vec<CartLine>> for Cart {
    fn from(lines: Vec<CartLine>) -> Self {
        Self::from_lines(lines)
    }
}

impl From<Cart> for Vec<CartLine> {
    fn from(cart: Cart) -> Self {
        cart.lines
    }
}
