//! Domain types for the commerce REST API.
//!
//! Field names follow the backend's JSON so these types deserialize
//! responses directly. Unknown fields are ignored except on [`Order`], which
//! is kept as an opaque record and preserves everything it does not model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cartsync_core::{
    CartId, CheckoutTokenId, FulfillmentStatus, LineItemId, Money, OrderId, PaymentStatus,
    ProductId,
};

// =============================================================================
// Product Types
// =============================================================================

/// Inventory tracking for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Inventory {
    /// Whether the backend tracks stock for this product.
    #[serde(default)]
    pub managed: bool,
    /// Units available when managed.
    #[serde(default)]
    pub available: i64,
}

/// Primary media attached to a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Media kind (e.g. "image").
    #[serde(rename = "type")]
    pub kind: String,
    /// Media URL.
    pub source: String,
}

/// Category a product belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: String,
    /// URL slug.
    pub slug: String,
    /// Display name.
    pub name: String,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// HTML description.
    #[serde(default)]
    pub description: String,
    /// URL permalink.
    #[serde(default)]
    pub permalink: String,
    /// SKU code.
    #[serde(default)]
    pub sku: Option<String>,
    /// Whether the product is purchasable.
    #[serde(default = "default_true")]
    pub active: bool,
    /// Current price.
    pub price: Money,
    /// Inventory information.
    #[serde(default)]
    pub inventory: Option<Inventory>,
    /// Primary media.
    #[serde(default)]
    pub media: Option<Media>,
    /// Sort position within the catalog.
    #[serde(default)]
    pub sort_order: i64,
    /// Categories.
    #[serde(default)]
    pub categories: Vec<Category>,
}

const fn default_true() -> bool {
    true
}

/// The ordered product catalog.
pub type ProductCatalog = Vec<Product>;

/// Pagination metadata for list responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub per_page: u64,
    #[serde(default)]
    pub current_page: u64,
    #[serde(default)]
    pub total_pages: u64,
}

/// Metadata accompanying a list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ListMeta {
    #[serde(default)]
    pub pagination: Pagination,
}

/// Response body of `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProductList {
    /// Products in catalog order.
    #[serde(default)]
    pub data: ProductCatalog,
    /// Pagination info.
    #[serde(default)]
    pub meta: ListMeta,
}

// =============================================================================
// Cart Types
// =============================================================================

/// Currency the cart is priced in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartCurrency {
    /// ISO 4217 code.
    pub code: String,
    /// Display symbol.
    pub symbol: String,
}

/// Image attached to a line item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItemImage {
    /// Image URL.
    pub url: String,
}

/// One product-quantity pair in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Line item ID.
    pub id: LineItemId,
    /// Product this line refers to (unique within a cart).
    pub product_id: ProductId,
    /// Product name at the time it was added.
    #[serde(default)]
    pub name: String,
    /// SKU code.
    #[serde(default)]
    pub sku: Option<String>,
    /// Quantity (always positive).
    pub quantity: u32,
    /// Unit price.
    pub price: Money,
    /// Price times quantity, as computed by the server.
    #[serde(default)]
    pub line_total: Money,
    /// Product image.
    #[serde(default)]
    pub image: Option<LineItemImage>,
}

/// A shopping cart.
///
/// `total_items` is the server's count of units in the cart. It is never
/// recomputed locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Cart ID.
    pub id: CartId,
    /// Creation timestamp (unix seconds).
    #[serde(default)]
    pub created: i64,
    /// Last update timestamp (unix seconds).
    #[serde(default)]
    pub updated: i64,
    /// Expiry timestamp (unix seconds).
    #[serde(default)]
    pub expires: i64,
    /// Total number of units across all lines.
    pub total_items: u32,
    /// Number of distinct lines.
    #[serde(default)]
    pub total_unique_items: u32,
    /// Subtotal before shipping and tax.
    #[serde(default)]
    pub subtotal: Money,
    /// Hosted checkout page.
    #[serde(default)]
    pub hosted_checkout_url: Option<String>,
    /// Cart currency.
    #[serde(default)]
    pub currency: Option<CartCurrency>,
    /// Line items in server order.
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl Cart {
    /// Find the line item for a product.
    #[must_use]
    pub fn line_item_for(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.line_items.iter().find(|item| &item.product_id == product_id)
    }

    /// Whether the cart has no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }
}

/// Response body of cart mutations (`{ "cart": {...} }`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartResponse {
    /// Whether the backend reported success.
    #[serde(default = "default_true")]
    pub success: bool,
    /// The cart after the mutation.
    pub cart: Cart,
}

impl From<Cart> for CartResponse {
    fn from(cart: Cart) -> Self {
        Self {
            success: true,
            cart,
        }
    }
}

// =============================================================================
// Checkout Types
// =============================================================================

/// Customer details for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Customer {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
}

/// Postal address used for shipping or billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Address {
    pub name: String,
    pub street: String,
    pub town_city: String,
    #[serde(default)]
    pub county_state: String,
    pub postal_zip_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country: String,
}

/// Chosen fulfillment option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Fulfillment {
    /// Shipping method ID offered by the checkout.
    pub shipping_method: String,
}

/// Raw card details (test gateway only).
///
/// Implements `Debug` manually so card numbers never reach logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    pub expiry_month: String,
    pub expiry_year: String,
    pub cvc: String,
    pub postal_zip_code: String,
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let last4: String = self
            .number
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("CardDetails")
            .field("number", &format!("****{last4}"))
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .field("cvc", &"[REDACTED]")
            .field("postal_zip_code", &self.postal_zip_code)
            .finish()
    }
}

/// Stripe payment method reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StripePayment {
    pub payment_method_id: String,
}

/// Payment section of an order draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Gateway name (e.g. "`test_gateway`", "stripe").
    pub gateway: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<CardDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe: Option<StripePayment>,
}

/// Everything the view assembles to capture a checkout.
///
/// Sent verbatim as the capture request body. Nothing here is validated
/// locally; the backend rejects incomplete drafts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDraft {
    pub customer: Customer,
    pub shipping: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing: Option<Address>,
    pub fulfillment: Fulfillment,
    pub payment: Payment,
    /// Any additional fields (line item overrides, extra fields, discounts).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A captured order.
///
/// Opaque beyond the fields below; everything else the backend returns is
/// preserved in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: OrderId,
    /// Checkout token the order was captured from.
    pub checkout_token_id: CheckoutTokenId,
    /// Cart the checkout was generated from.
    #[serde(default)]
    pub cart_id: Option<CartId>,
    /// Human-facing order reference.
    #[serde(default)]
    pub customer_reference: String,
    /// Creation timestamp (unix seconds).
    #[serde(default)]
    pub created: i64,
    /// Payment status.
    #[serde(default)]
    pub status_payment: PaymentStatus,
    /// Fulfillment status.
    #[serde(default)]
    pub status_fulfillment: FulfillmentStatus,
    /// Customer the order belongs to.
    #[serde(default)]
    pub customer: Option<Customer>,
    /// Total charged.
    #[serde(default)]
    pub order_value: Option<Money>,
    /// Remaining fields, untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Order {
    /// Creation time as a UTC timestamp.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created, 0)
    }
}
