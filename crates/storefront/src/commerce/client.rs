//! REST client for the commerce backend.
//!
//! Uses `reqwest` for HTTP and caches the product catalog using `moka`
//! (TTL from configuration). Cart and checkout calls are never cached.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use cartsync_core::{CartId, CheckoutTokenId, ProductId};

use super::{
    Cart, CartResponse, CommerceError, CommerceGateway, Order, OrderDraft, ProductList,
};
use crate::config::CommerceConfig;

/// Cache key for catalog responses.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
enum CacheKey {
    Catalog { limit: u32 },
}

/// Body of `POST /carts/{cart_id}`.
#[derive(Debug, Serialize)]
struct AddItemBody<'a> {
    id: &'a str,
    quantity: u32,
}

/// Body of `PUT /carts/{cart_id}/items/{item}`.
#[derive(Debug, Serialize)]
struct UpdateItemBody {
    quantity: u32,
}

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce REST API.
///
/// Holds the current cart the way the browser SDK keeps it in a cookie: the
/// first cart call creates one, mutations reuse its ID, and
/// [`refresh_cart`](CommerceGateway::refresh_cart) replaces it.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    config: CommerceConfig,
    cache: Cache<CacheKey, ProductList>,
    /// Last cart received from the backend
    cart: RwLock<Option<Cart>>,
}

impl CommerceClient {
    /// Create a new commerce API client.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Http` if the HTTP client cannot be built.
    pub fn new(config: &CommerceConfig) -> Result<Self, CommerceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let cache = Cache::builder()
            .max_capacity(16)
            .time_to_live(config.catalog_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                config: config.clone(),
                cache,
                cart: RwLock::new(None),
            }),
        })
    }

    /// Resume an existing cart instead of creating a new one on first use.
    pub async fn resume_cart(&self, cart: Cart) {
        *self.inner.cart.write().await = Some(cart);
    }

    /// The ID of the cart this client is operating on, if one exists yet.
    pub async fn current_cart_id(&self) -> Option<CartId> {
        self.inner.cart.read().await.as_ref().map(|c| c.id.clone())
    }

    /// Drop the cached catalog so the next listing hits the backend.
    pub async fn invalidate_catalog(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    /// Execute a request and decode a JSON response.
    async fn execute<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, CommerceError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut request = self
            .inner
            .client
            .request(method, self.inner.config.endpoint(path))
            .header("X-Authorization", self.inner.config.expose_key())
            .header("Accept", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(CommerceError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::warn!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            return Err(CommerceError::from_response(status.as_u16(), &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %response_text.chars().take(500).collect::<String>(),
                "Failed to parse commerce API response"
            );
            CommerceError::Parse(e)
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CommerceError> {
        self.execute::<T, ()>(Method::GET, path, None).await
    }

    /// Remember the cart the backend just returned.
    async fn remember(&self, cart: &Cart) {
        *self.inner.cart.write().await = Some(cart.clone());
    }

    /// ID of the current cart, creating the first cart if none exists yet.
    ///
    /// The cart is created under the write lock, so concurrent first calls
    /// share one backend cart. The new cart is returned to the call that
    /// created it.
    async fn ensure_cart(&self) -> Result<(CartId, Option<Cart>), CommerceError> {
        if let Some(id) = self.current_cart_id().await {
            return Ok((id, None));
        }

        let mut current = self.inner.cart.write().await;
        if let Some(cart) = current.as_ref() {
            return Ok((cart.id.clone(), None));
        }

        let cart: Cart = self.get("carts").await?;
        debug!(cart_id = %cart.id, "Created cart");
        *current = Some(cart.clone());
        Ok((cart.id.clone(), Some(cart)))
    }

    /// Path segment addressing the line item for a product.
    async fn item_segment(&self, product_id: &ProductId) -> String {
        let cart = self.inner.cart.read().await;
        item_segment_for(cart.as_ref(), product_id)
    }
}

/// Map a product to the line item the backend addresses it by.
///
/// Falls back to the product ID itself when the last known cart has no line
/// for it; the backend decides whether that is valid.
fn item_segment_for(cart: Option<&Cart>, product_id: &ProductId) -> String {
    cart.and_then(|c| c.line_item_for(product_id))
        .map_or_else(|| product_id.to_string(), |item| item.id.to_string())
}

#[async_trait]
impl CommerceGateway for CommerceClient {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<ProductList, CommerceError> {
        let limit = self.inner.config.product_limit;
        let key = CacheKey::Catalog { limit };

        if let Some(list) = self.inner.cache.get(&key).await {
            debug!("Cache hit for catalog");
            return Ok(list);
        }

        let list: ProductList = self.get(&format!("products?limit={limit}")).await?;
        self.inner.cache.insert(key, list.clone()).await;

        debug!(count = list.data.len(), "Fetched catalog");
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn retrieve_cart(&self) -> Result<Cart, CommerceError> {
        let (cart_id, created) = self.ensure_cart().await?;
        if let Some(cart) = created {
            return Ok(cart);
        }

        let cart: Cart = self.get(&format!("carts/{cart_id}")).await?;
        self.remember(&cart).await;
        Ok(cart)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError> {
        let (cart_id, _) = self.ensure_cart().await?;
        let body = AddItemBody {
            id: product_id.as_str(),
            quantity,
        };

        let response: CartResponse = self
            .execute(Method::POST, &format!("carts/{cart_id}"), Some(&body))
            .await?;
        self.remember(&response.cart).await;
        Ok(response)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError> {
        let (cart_id, _) = self.ensure_cart().await?;
        let item = self.item_segment(product_id).await;

        let response: CartResponse = self
            .execute(
                Method::PUT,
                &format!("carts/{cart_id}/items/{item}"),
                Some(&UpdateItemBody { quantity }),
            )
            .await?;
        self.remember(&response.cart).await;
        Ok(response)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        product_id: &ProductId,
    ) -> Result<CartResponse, CommerceError> {
        let (cart_id, _) = self.ensure_cart().await?;
        let item = self.item_segment(product_id).await;

        let response: CartResponse = self
            .execute::<_, ()>(Method::DELETE, &format!("carts/{cart_id}/items/{item}"), None)
            .await?;
        self.remember(&response.cart).await;
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn empty_cart(&self) -> Result<CartResponse, CommerceError> {
        let (cart_id, _) = self.ensure_cart().await?;

        let response: CartResponse = self
            .execute::<_, ()>(Method::DELETE, &format!("carts/{cart_id}/items"), None)
            .await?;
        self.remember(&response.cart).await;
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn refresh_cart(&self) -> Result<Cart, CommerceError> {
        let cart: Cart = self.get("carts").await?;
        self.remember(&cart).await;
        Ok(cart)
    }

    #[instrument(skip(self, draft), fields(token = %token))]
    async fn capture_checkout(
        &self,
        token: &CheckoutTokenId,
        draft: &OrderDraft,
    ) -> Result<Order, CommerceError> {
        self.execute(Method::POST, &format!("checkouts/{token}"), Some(draft))
            .await
    }
}
