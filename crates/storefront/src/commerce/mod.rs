//! Commerce backend gateway.
//!
//! # Architecture
//!
//! - The backend is the source of truth for catalog, cart and order state
//! - [`CommerceGateway`] is the request/response contract the cart controller
//!   depends on; it never sees HTTP
//! - [`CommerceClient`] talks to the REST API over `reqwest`, caching the
//!   catalog via `moka` (carts are never cached)
//! - [`MemoryCommerce`] implements the same contract in-process for offline
//!   runs and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use cartsync_storefront::commerce::{CommerceClient, CommerceGateway};
//!
//! let client = CommerceClient::new(&config)?;
//!
//! let products = client.list_products().await?.data;
//! let cart = client.add_to_cart(&products[0].id, 1).await?.cart;
//! ```

mod client;
mod memory;
pub mod types;

pub use client::CommerceClient;
pub use memory::{DECLINED_CARD, MemoryCommerce, Operation};
pub use types::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cartsync_core::{CheckoutTokenId, ProductId};

/// Errors that can occur when talking to the commerce backend.
#[derive(Debug, Error)]
pub enum CommerceError {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with a non-success status and an error payload.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Human-readable message from `error.message`.
        message: String,
        /// Error category from `error.type`, if any.
        kind: Option<String>,
    },

    /// Response body could not be decoded.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Referenced resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request refused by backend validation.
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl CommerceError {
    /// The message shown to a shopper for this failure.
    ///
    /// Uses the backend's own wording when the failure carried a payload and
    /// falls back to the error's `Display` form otherwise.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Rejected(message) | Self::NotFound(message) => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    /// Build an `Api` error from a status code and raw response body.
    ///
    /// Bodies that are not a valid error payload keep a truncated copy of the
    /// text as the message.
    #[must_use]
    pub fn from_response(status: u16, body: &str) -> Self {
        match serde_json::from_str::<ErrorPayload>(body) {
            Ok(payload) => Self::Api {
                status,
                message: payload.error.message,
                kind: payload.error.kind,
            },
            Err(_) => Self::Api {
                status,
                message: format!("HTTP {status}: {}", body.chars().take(200).collect::<String>()),
                kind: None,
            },
        }
    }
}

/// Error body returned by the backend on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub error: ErrorDetail,
    #[serde(default)]
    pub status_code: Option<u16>,
}

/// The `error` object of an [`ErrorPayload`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Human-readable message.
    pub message: String,
    /// Error category (e.g. "`gateways_error`", "validation").
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Per-field validation messages.
    #[serde(default)]
    pub errors: Option<serde_json::Value>,
}

/// Request/response contract of the remote commerce service.
///
/// Every method is a single round trip. Implementations hold whatever session
/// state the backend needs (such as the current cart ID) so callers only pass
/// what the shopper chose.
#[async_trait]
pub trait CommerceGateway: Send + Sync {
    /// List the product catalog.
    async fn list_products(&self) -> Result<ProductList, CommerceError>;

    /// Retrieve the current cart, creating one if none exists yet.
    async fn retrieve_cart(&self) -> Result<Cart, CommerceError>;

    /// Add `quantity` units of a product.
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError>;

    /// Set the line item for a product to exactly `quantity`.
    async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError>;

    /// Remove the line item for a product.
    async fn remove_cart_item(&self, product_id: &ProductId)
    -> Result<CartResponse, CommerceError>;

    /// Remove every line item.
    async fn empty_cart(&self) -> Result<CartResponse, CommerceError>;

    /// Start a fresh cart, discarding the current cart token.
    async fn refresh_cart(&self) -> Result<Cart, CommerceError>;

    /// Capture an order for a checkout token.
    async fn capture_checkout(
        &self,
        token: &CheckoutTokenId,
        draft: &OrderDraft,
    ) -> Result<Order, CommerceError>;
}
