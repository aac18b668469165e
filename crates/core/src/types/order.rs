//! Orders and the checkout handoff record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AddressForm, Cart, CartLine, Cents, OrderId, OrderStatus, ProductId};

/// One purchased product, in the backend's order-item shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub name: String,
    #[serde(default)]
    pub brand: String,
    pub quantity: u32,
    #[serde(rename = "price")]
    pub price_cents: Cents,
    #[serde(rename = "product")]
    pub product_id: ProductId,
    #[serde(rename = "cartImageUrl", default)]
    pub image_url: String,
}

impl OrderLine {
    #[must_use]
    pub const fn line_total(&self) -> Cents {
        self.price_cents.times(self.quantity)
    }
}

impl From<&CartLine> for OrderLine {
    fn from(line: &CartLine) -> Self {
        Self {
            name: line.name.clone(),
            brand: line.brand.clone(),
            quantity: line.quantity,
            price_cents: line.price_cents,
            product_id: line.id.clone(),
            image_url: line.image_url.clone(),
        }
    }
}

impl From<&OrderLine> for CartLine {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.product_id.clone(),
            name: line.name.clone(),
            price_cents: line.price_cents,
            quantity: line.quantity,
            image_url: line.image_url.clone(),
            brand: line.brand.clone(),
        }
    }
}

/// Durable snapshot of checkout intent.
///
/// Written to the visitor's storage right before the redirect to the hosted
/// payment page, and consumed (read, then deleted) once on the way back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffRecord {
    pub cart: Vec<OrderLine>,
    pub shipping_address: AddressForm,
    #[serde(rename = "totalPrice")]
    pub total_price_cents: Cents,
    /// Sent as the `Idempotency-Key` header when the order is created.
    pub idempotency_key: Uuid,
    pub created_at: DateTime<Utc>,
}

impl HandoffRecord {
    /// Snapshot a cart and the submitted billing address.
    ///
    /// The total is the cart subtotal at this instant.
    #[must_use]
    pub fn from_cart(cart: &Cart, shipping_address: AddressForm) -> Self {
        Self {
            cart: cart.lines().iter().map(OrderLine::from).collect(),
            shipping_address: shipping_address.normalized(),
            total_price_cents: cart.subtotal(),
            idempotency_key: Uuid::new_v4(),
            created_at: Utc::now(),
        }
    }
}

/// Customer reference on an order: populated by the admin listing, a bare
/// id elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderCustomer {
    Populated {
        #[serde(default)]
        name: String,
        #[serde(default)]
        email: String,
    },
    Id(String),
}

impl OrderCustomer {
    /// Best label for the admin order list.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Populated { name, email } if name.is_empty() => email.as_str(),
            Self::Populated { name, .. } => name.as_str(),
            Self::Id(id) => id.as_str(),
        }
    }
}

/// An order as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    #[serde(default)]
    pub order_items: Vec<OrderLine>,
    #[serde(default)]
    pub shipping_address: AddressForm,
    #[serde(rename = "totalPrice", default)]
    pub total_price_cents: Cents,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<OrderCustomer>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::CartProduct;

    fn address() -> AddressForm {
        AddressForm {
            name: "Sam".to_string(),
            email: "sam@example.com".to_string(),
            phone: "5550100".to_string(),
            address_line1: "1 King St".to_string(),
            address_line2: Some(String::new()),
            city: "Toronto".to_string(),
            postal_code: "M5H".to_string(),
            country: "Canada".to_string(),
        }
    }

    #[test]
    fn test_handoff_snapshot_of_single_item_cart() {
        let mut cart = Cart::new();
        cart.add_item(CartProduct {
            id: ProductId::new("p1"),
            name: "Tee".to_string(),
            price_cents: Cents::new(999),
            image_url: "tee.jpg".to_string(),
            brand: "Ironic".to_string(),
        });

        let record = HandoffRecord::from_cart(&cart, address());
        assert_eq!(record.total_price_cents, Cents::new(999));
        assert_eq!(record.cart.len(), 1);
        assert_eq!(record.cart[0].product_id.as_str(), "p1");
        assert_eq!(record.shipping_address.address_line2, None);
    }

    #[test]
    fn test_handoff_json_shape() {
        let record = HandoffRecord::from_cart(&Cart::new(), address());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("shippingAddress").is_some());
        assert!(json.get("totalPrice").is_some());
        assert!(json.get("idempotencyKey").is_some());

        let restored: HandoffRecord = serde_json::from_value(json).unwrap();
        assert_eq!(restored, record);
    }

    #[test]
    fn test_order_line_wire_names() {
        let line = OrderLine {
            name: "Tee".to_string(),
            brand: "Ironic".to_string(),
            quantity: 2,
            price_cents: Cents::new(1000),
            product_id: ProductId::new("p1"),
            image_url: "tee.jpg".to_string(),
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["price"], 1000);
        assert_eq!(json["product"], "p1");
        assert_eq!(json["cartImageUrl"], "tee.jpg");
        assert_eq!(line.line_total(), Cents::new(2000));
    }

    #[test]
    fn test_order_deserializes_with_populated_or_bare_user() {
        let populated: Order = serde_json::from_value(serde_json::json!({
            "_id": "o1",
            "totalPrice": 2200,
            "status": "Dispatched",
            "user": {"name": "Sam", "email": "sam@example.com"}
        }))
        .unwrap();
        assert_eq!(populated.status, OrderStatus::Dispatched);
        assert_eq!(populated.user.unwrap().label(), "Sam");

        let bare: Order = serde_json::from_value(serde_json::json!({
            "_id": "o2",
            "user": "u1"
        }))
        .unwrap();
        assert_eq!(bare.status, OrderStatus::Received);
        assert_eq!(bare.user.unwrap().label(), "u1");
    }
}
