//! Catalog products as served by `GET /api/products`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Cents, ProductId};

/// Product category used to group the home page rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum ProductCategory {
    #[default]
    Tee,
    Hoodie,
    Shorts,
    Accessory,
    /// Any category the backend knows about that the storefront does not.
    Other(String),
}

impl ProductCategory {
    /// Categories shown as rows on the home page, in display order.
    pub const HOME_ROWS: [Self; 4] = [Self::Hoodie, Self::Tee, Self::Shorts, Self::Accessory];

    /// The backend's name for this category.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Tee => "Tee",
            Self::Hoodie => "Hoodie",
            Self::Shorts => "Shorts",
            Self::Accessory => "Accessory",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for ProductCategory {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Tee" => Self::Tee,
            "Hoodie" => Self::Hoodie,
            "Shorts" => Self::Shorts,
            "Accessory" => Self::Accessory,
            _ => Self::Other(name),
        }
    }
}

impl From<ProductCategory> for String {
    fn from(category: ProductCategory) -> Self {
        match category {
            ProductCategory::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    pub name: String,
    #[serde(rename = "price")]
    pub price_cents: Cents,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub category: ProductCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub main_image_url: String,
    #[serde(default)]
    pub cart_image_url: String,
    /// Units in stock.
    #[serde(default)]
    pub quantity: u32,
    #[serde(default)]
    pub is_best_seller: bool,
}

impl Product {
    /// Whether at least one unit is in stock.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.quantity > 0
    }

    /// Image used for the cart thumbnail, falling back to the main image.
    #[must_use]
    pub fn thumbnail_url(&self) -> &str {
        if self.cart_image_url.is_empty() {
            &self.main_image_url
        } else {
            &self.cart_image_url
        }
    }

    /// Case-insensitive match against name, brand or category.
    #[must_use]
    pub fn matches(&self, term: &str) -> bool {
        let term = term.trim().to_lowercase();
        if term.is_empty() {
            return false;
        }
        self.name.to_lowercase().contains(&term)
            || self.brand.to_lowercase().contains(&term)
            || self.category.as_str().to_lowercase().contains(&term)
    }
}

/// Admin payload for creating or updating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(rename = "price")]
    pub price_cents: Cents,
    pub brand: String,
    pub quantity: u32,
    pub category: ProductCategory,
    pub is_best_seller: bool,
    pub description: String,
    pub main_image_url: String,
    pub cart_image_url: String,
}

impl From<&Product> for ProductDraft {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price_cents: product.price_cents,
            brand: product.brand.clone(),
            quantity: product.quantity,
            category: product.category.clone(),
            is_best_seller: product.is_best_seller,
            description: product.description.clone(),
            main_image_url: product.main_image_url.clone(),
            cart_image_url: product.cart_image_url.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn product_json() -> serde_json::Value {
        serde_json::json!({
            "_id": "p1",
            "name": "Oversized Pump Cover",
            "price": 4500,
            "brand": "Ironic",
            "category": "Hoodie",
            "mainImageUrl": "https://cdn.example/main.jpg",
            "cartImageUrl": "",
            "quantity": 3,
            "isBestSeller": true
        })
    }

    #[test]
    fn test_deserialize_backend_product() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        assert_eq!(product.id.as_str(), "p1");
        assert_eq!(product.price_cents, Cents::new(4500));
        assert_eq!(product.category, ProductCategory::Hoodie);
        assert!(product.is_best_seller);
        assert!(product.in_stock());
        assert_eq!(product.thumbnail_url(), "https://cdn.example/main.jpg");
    }

    #[test]
    fn test_unknown_category_round_trips() {
        let category: ProductCategory = serde_json::from_str("\"Socks\"").unwrap();
        assert_eq!(category, ProductCategory::Other("Socks".to_string()));
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"Socks\"");
    }

    #[test]
    fn test_matches_name_brand_or_category() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        assert!(product.matches("pump"));
        assert!(product.matches("IRONIC"));
        assert!(product.matches("hood"));
        assert!(!product.matches("shorts"));
        assert!(!product.matches("   "));
    }

    #[test]
    fn test_draft_keeps_every_editable_field() {
        let product: Product = serde_json::from_value(product_json()).unwrap();
        let draft = ProductDraft::from(&product);
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json["price"], 4500);
        assert_eq!(json["isBestSeller"], true);
        assert_eq!(json["category"], "Hoodie");
        assert!(json.get("_id").is_none());
    }
}
