//! Wire types for the remote storefront service.
//!
//! All monetary values are integers in minor currency units. Timestamps
//! are RFC 3339 strings; the service may omit them, so they deserialize
//! as options.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use greenmarket_core::{CartId, CartItemId, CartStatus, OrderId, OrderItemId, OrderStatus, ProductId};

// =============================================================================
// Catalog
// =============================================================================

/// A catalog product.
///
/// Immutable from the client's perspective; owned by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Unit price in minor currency units.
    pub price_cents: i64,
    pub currency_code: String,
    pub active: bool,
    /// Units available in stock.
    pub quantity: i64,
    /// Units reserved by open carts.
    pub reserved: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// One product line within a cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Always >= 1; removal is modeled as item deletion, never quantity zero.
    pub quantity: i64,
    /// Unit price frozen at the time of addition, in minor currency units.
    pub unit_price_cents: i64,
    pub currency_code: String,
    /// Embedded product snapshot for display, when the service provides one.
    #[serde(default)]
    pub product: Option<Product>,
}

/// A server-owned cart aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub status: CartStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Line items in display order.
    pub items: Vec<CartItem>,
    /// Authoritative subtotal computed by the service, in minor currency
    /// units. Never recomputed client-side.
    pub subtotal_cents: i64,
    pub currency_code: String,
}

impl Cart {
    /// Total number of units across all line items.
    #[must_use]
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// Response to a cart-creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCartResponse {
    pub cart_id: CartId,
}

// =============================================================================
// Orders
// =============================================================================

/// One product line within an order.
///
/// Carries a snapshot of the product name and price at the time of
/// purchase; `product_id` is nullable because the product may later be
/// removed from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
    pub currency_code: String,
}

/// An order created from a checked-out cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Originating cart, when the service still knows it.
    #[serde(default)]
    pub cart_id: Option<CartId>,
    pub status: OrderStatus,
    #[serde(default)]
    pub customer_email: Option<String>,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub shipping_cents: i64,
    pub total_cents: i64,
    pub currency_code: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItem>,
}

// =============================================================================
// Requests
// =============================================================================

/// Body of an add-item request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Body of an update-quantity request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateItemQuantityRequest {
    pub quantity: i64,
}

/// Body of a checkout request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    #[serde(default)]
    pub customer_email: Option<String>,
}
