//! In-process commerce backend.
//!
//! Implements [`CommerceGateway`] with the same observable semantics as the
//! REST backend: carts are keyed by token, quantity 0 removes a line,
//! capturing a checkout consumes the token and retires the cart. Used for
//! offline runs of the CLI and as a realistic backend in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use cartsync_core::{
    CartId, CheckoutTokenId, CurrencyCode, FulfillmentStatus, LineItemId, Money, OrderId,
    PaymentStatus, ProductId,
};

use super::{
    Cart, CartCurrency, CartResponse, CommerceError, CommerceGateway, LineItem, ListMeta, Order,
    OrderDraft, Pagination, Product, ProductList,
};

/// Card number the in-process payment gateway always declines.
pub const DECLINED_CARD: &str = "4000000000000002";

/// Gateway operations, used for failure injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListProducts,
    RetrieveCart,
    AddToCart,
    UpdateCartItem,
    RemoveCartItem,
    EmptyCart,
    RefreshCart,
    CaptureCheckout,
}

/// In-memory commerce backend.
pub struct MemoryCommerce {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    catalog: Vec<Product>,
    cart: Option<Cart>,
    /// Open checkout tokens and the cart each was generated from
    checkouts: HashMap<CheckoutTokenId, CartId>,
    orders: Vec<Order>,
    failures: VecDeque<(Operation, String)>,
    calls: HashMap<Operation, usize>,
    sequence: u64,
}

impl MemoryCommerce {
    /// Create a backend serving the given catalog.
    #[must_use]
    pub fn new(catalog: Vec<Product>) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                catalog,
                ..MemoryState::default()
            }),
        }
    }

    /// A small catalog for offline runs.
    #[must_use]
    pub fn with_demo_catalog() -> Self {
        let product = |id: &str, name: &str, cents: i64| Product {
            id: ProductId::new(id),
            name: name.to_string(),
            description: format!("<p>{name}</p>"),
            permalink: id.trim_start_matches("prod_").to_lowercase(),
            sku: None,
            active: true,
            price: Money::from_raw(Decimal::new(cents, 2), CurrencyCode::USD),
            inventory: None,
            media: None,
            sort_order: 0,
            categories: Vec::new(),
        };

        Self::new(vec![
            product("prod_headphones", "Headphone Bing", 35_000),
            product("prod_earbuds", "Earbuds Lite", 8_900),
            product("prod_speaker", "Pocket Speaker", 12_450),
        ])
    }

    /// Make the next call of `operation` fail with `message`.
    pub fn fail_next(&self, operation: Operation, message: impl Into<String>) {
        self.lock().failures.push_back((operation, message.into()));
    }

    /// Number of times `operation` has been called.
    #[must_use]
    pub fn calls(&self, operation: Operation) -> usize {
        self.lock().calls.get(&operation).copied().unwrap_or(0)
    }

    /// Open a checkout for the current cart and return its token.
    ///
    /// # Errors
    ///
    /// Returns `CommerceError::Rejected` if the cart is empty.
    pub fn generate_token(&self) -> Result<CheckoutTokenId, CommerceError> {
        let mut state = self.lock();
        let cart = state.current_cart().clone();
        if cart.is_empty() {
            return Err(CommerceError::Rejected(
                "Cannot generate a checkout for an empty cart".to_string(),
            ));
        }
        let token = CheckoutTokenId::new(format!("chkt_{:04}", state.next_sequence()));
        state.checkouts.insert(token.clone(), cart.id);
        Ok(token)
    }

    /// Orders captured so far.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Count the call and consume an injected failure, if any.
    fn begin(&self, operation: Operation) -> Result<MutexGuard<'_, MemoryState>, CommerceError> {
        let mut state = self.lock();
        *state.calls.entry(operation).or_insert(0) += 1;

        if let Some(pos) = state.failures.iter().position(|(op, _)| *op == operation)
            && let Some((_, message)) = state.failures.remove(pos)
        {
            debug!(?operation, %message, "Injected failure");
            return Err(CommerceError::Api {
                status: 500,
                message,
                kind: Some("injected".to_string()),
            });
        }

        Ok(state)
    }
}

impl MemoryState {
    fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    fn new_cart(&mut self) -> Cart {
        let now = Utc::now().timestamp();
        Cart {
            id: CartId::new(format!("cart_{:04}", self.next_sequence())),
            created: now,
            updated: now,
            expires: now + 30 * 24 * 60 * 60,
            total_items: 0,
            total_unique_items: 0,
            subtotal: Money::zero(CurrencyCode::USD),
            hosted_checkout_url: None,
            currency: Some(CartCurrency {
                code: CurrencyCode::USD.code().to_string(),
                symbol: CurrencyCode::USD.symbol().to_string(),
            }),
            line_items: Vec::new(),
        }
    }

    /// The current cart, creating one on first use.
    fn current_cart(&mut self) -> &mut Cart {
        let cart = match self.cart.take() {
            Some(cart) => cart,
            None => self.new_cart(),
        };
        self.cart.insert(cart)
    }

    fn product(&self, product_id: &ProductId) -> Result<Product, CommerceError> {
        self.catalog
            .iter()
            .find(|p| &p.id == product_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(format!("Product not found: {product_id}")))
    }

    /// Recompute server-side totals on an edited cart and make it current.
    ///
    /// A cart whose totals do not fit is rejected and the current cart is
    /// left as it was.
    fn settle(&mut self, mut cart: Cart) -> Result<Cart, CommerceError> {
        let mut total_items: u32 = 0;
        let mut subtotal = Decimal::ZERO;
        for item in &mut cart.line_items {
            let line_total = item
                .price
                .raw
                .checked_mul(Decimal::from(item.quantity))
                .ok_or_else(too_large)?;
            item.line_total = Money::from_raw(line_total, CurrencyCode::USD);
            total_items = total_items.checked_add(item.quantity).ok_or_else(too_large)?;
            subtotal = subtotal.checked_add(line_total).ok_or_else(too_large)?;
        }

        cart.total_items = total_items;
        cart.total_unique_items = u32::try_from(cart.line_items.len()).map_err(|_| too_large())?;
        cart.subtotal = Money::from_raw(subtotal, CurrencyCode::USD);
        cart.updated = Utc::now().timestamp();
        self.cart = Some(cart.clone());
        Ok(cart)
    }
}

fn line_missing(product_id: &ProductId) -> CommerceError {
    CommerceError::NotFound(format!("Line item not found for product {product_id}"))
}

fn too_large() -> CommerceError {
    CommerceError::Rejected("quantity too large".to_string())
}

#[async_trait]
impl CommerceGateway for MemoryCommerce {
    #[instrument(skip(self))]
    async fn list_products(&self) -> Result<ProductList, CommerceError> {
        let state = self.begin(Operation::ListProducts)?;
        let total = u64::try_from(state.catalog.len()).unwrap_or(u64::MAX);
        Ok(ProductList {
            data: state.catalog.clone(),
            meta: ListMeta {
                pagination: Pagination {
                    total,
                    count: total,
                    per_page: total,
                    current_page: 1,
                    total_pages: 1,
                },
            },
        })
    }

    #[instrument(skip(self))]
    async fn retrieve_cart(&self) -> Result<Cart, CommerceError> {
        let mut state = self.begin(Operation::RetrieveCart)?;
        Ok(state.current_cart().clone())
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError> {
        let mut state = self.begin(Operation::AddToCart)?;
        if quantity == 0 {
            return Err(CommerceError::Rejected(
                "The quantity must be at least 1".to_string(),
            ));
        }
        let product = state.product(product_id)?;
        if !product.active {
            return Err(CommerceError::Rejected(format!(
                "Product is not available: {product_id}"
            )));
        }

        let sequence = state.next_sequence();
        let mut cart = state.current_cart().clone();
        if let Some(item) = cart
            .line_items
            .iter_mut()
            .find(|i| &i.product_id == product_id)
        {
            item.quantity = item.quantity.checked_add(quantity).ok_or_else(too_large)?;
        } else {
            cart.line_items.push(LineItem {
                id: LineItemId::new(format!("item_{sequence:04}")),
                product_id: product.id.clone(),
                name: product.name.clone(),
                sku: product.sku.clone(),
                quantity,
                price: product.price.clone(),
                line_total: Money::zero(CurrencyCode::USD),
                image: None,
            });
        }

        state.settle(cart).map(CartResponse::from)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_cart_item(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartResponse, CommerceError> {
        let mut state = self.begin(Operation::UpdateCartItem)?;
        let mut cart = state.current_cart().clone();
        let pos = cart
            .line_items
            .iter()
            .position(|i| &i.product_id == product_id)
            .ok_or_else(|| line_missing(product_id))?;

        if quantity == 0 {
            cart.line_items.remove(pos);
        } else if let Some(item) = cart.line_items.get_mut(pos) {
            item.quantity = quantity;
        }

        state.settle(cart).map(CartResponse::from)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_cart_item(
        &self,
        product_id: &ProductId,
    ) -> Result<CartResponse, CommerceError> {
        let mut state = self.begin(Operation::RemoveCartItem)?;
        let mut cart = state.current_cart().clone();
        let before = cart.line_items.len();
        cart.line_items.retain(|i| &i.product_id != product_id);
        if cart.line_items.len() == before {
            return Err(line_missing(product_id));
        }

        state.settle(cart).map(CartResponse::from)
    }

    #[instrument(skip(self))]
    async fn empty_cart(&self) -> Result<CartResponse, CommerceError> {
        let mut state = self.begin(Operation::EmptyCart)?;
        let mut cart = state.current_cart().clone();
        cart.line_items.clear();
        state.settle(cart).map(CartResponse::from)
    }

    #[instrument(skip(self))]
    async fn refresh_cart(&self) -> Result<Cart, CommerceError> {
        let mut state = self.begin(Operation::RefreshCart)?;
        let cart = state.new_cart();
        state.cart = Some(cart.clone());
        Ok(cart)
    }

    #[instrument(skip(self, draft), fields(token = %token))]
    async fn capture_checkout(
        &self,
        token: &CheckoutTokenId,
        draft: &OrderDraft,
    ) -> Result<Order, CommerceError> {
        let mut state = self.begin(Operation::CaptureCheckout)?;

        let cart_id = state.checkouts.get(token).cloned().ok_or_else(|| {
            CommerceError::NotFound(format!("Checkout token not found: {token}"))
        })?;

        if draft.customer.email.trim().is_empty() {
            return Err(CommerceError::Api {
                status: 422,
                message: "The customer.email field is required.".to_string(),
                kind: Some("validation".to_string()),
            });
        }

        if draft
            .payment
            .card
            .as_ref()
            .is_some_and(|card| card.number == DECLINED_CARD)
        {
            return Err(CommerceError::Api {
                status: 402,
                message: "Card declined".to_string(),
                kind: Some("gateway_error".to_string()),
            });
        }

        let subtotal = state
            .cart
            .as_ref()
            .filter(|c| c.id == cart_id)
            .map(|c| c.subtotal.clone());

        let sequence = state.next_sequence();
        let order = Order {
            id: OrderId::new(format!("ord_{sequence:04}")),
            checkout_token_id: token.clone(),
            cart_id: Some(cart_id.clone()),
            customer_reference: format!("CARTSYNC-{sequence:06}"),
            created: Utc::now().timestamp(),
            status_payment: PaymentStatus::Paid,
            status_fulfillment: FulfillmentStatus::NotFulfilled,
            customer: Some(draft.customer.clone()),
            order_value: subtotal,
            extra: serde_json::Map::new(),
        };

        // Capturing consumes the token and retires the cart it came from.
        state.checkouts.remove(token);
        if state.cart.as_ref().is_some_and(|c| c.id == cart_id) {
            state.cart = None;
        }
        state.orders.push(order.clone());

        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::commerce::{Address, CardDetails, Customer, Fulfillment, Payment};

    fn draft(card_number: &str) -> OrderDraft {
        OrderDraft {
            customer: Customer {
                firstname: "Ada".to_string(),
                lastname: "Lovelace".to_string(),
                email: "ada@example.com".to_string(),
            },
            shipping: Address {
                name: "Ada Lovelace".to_string(),
                street: "1 Analytical Way".to_string(),
                town_city: "London".to_string(),
                county_state: String::new(),
                postal_zip_code: "N1 9GU".to_string(),
                country: "GB".to_string(),
            },
            billing: None,
            fulfillment: Fulfillment {
                shipping_method: "ship_standard".to_string(),
            },
            payment: Payment {
                gateway: "test_gateway".to_string(),
                card: Some(CardDetails {
                    number: card_number.to_string(),
                    expiry_month: "01".to_string(),
                    expiry_year: "30".to_string(),
                    cvc: "123".to_string(),
                    postal_zip_code: "94107".to_string(),
                }),
                stripe: None,
            },
            extra: serde_json::Map::new(),
        }
    }

    #[tokio::test]
    async fn test_add_merges_quantity_and_totals() {
        let backend = MemoryCommerce::with_demo_catalog();
        let headphones = ProductId::new("prod_headphones");

        backend.add_to_cart(&headphones, 1).await.unwrap();
        let cart = backend.add_to_cart(&headphones, 2).await.unwrap().cart;

        assert_eq!(cart.line_items.len(), 1);
        assert_eq!(cart.total_items, 3);
        assert_eq!(cart.subtotal.raw, Decimal::new(1_050, 0));
        assert_eq!(cart.subtotal.formatted_with_symbol, "$1050.00");
    }

    #[tokio::test]
    async fn test_update_zero_removes_line() {
        let backend = MemoryCommerce::with_demo_catalog();
        let earbuds = ProductId::new("prod_earbuds");
        backend.add_to_cart(&earbuds, 4).await.unwrap();

        let cart = backend.update_cart_item(&earbuds, 0).await.unwrap().cart;
        assert!(cart.line_item_for(&earbuds).is_none());
        assert_eq!(cart.total_items, 0);
    }

    #[tokio::test]
    async fn test_add_quantity_overflow_rejected() {
        let backend = MemoryCommerce::with_demo_catalog();
        let headphones = ProductId::new("prod_headphones");
        backend.add_to_cart(&headphones, u32::MAX).await.unwrap();

        let err = backend.add_to_cart(&headphones, 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::Rejected(ref m) if m == "quantity too large"));

        let cart = backend.retrieve_cart().await.unwrap();
        assert_eq!(cart.line_item_for(&headphones).unwrap().quantity, u32::MAX);
        assert_eq!(cart.total_items, u32::MAX);
    }

    #[tokio::test]
    async fn test_total_items_overflow_leaves_cart_unchanged() {
        let backend = MemoryCommerce::with_demo_catalog();
        let earbuds = ProductId::new("prod_earbuds");
        let speaker = ProductId::new("prod_speaker");
        backend.add_to_cart(&earbuds, u32::MAX).await.unwrap();

        let err = backend.add_to_cart(&speaker, 1).await.unwrap_err();
        assert!(matches!(err, CommerceError::Rejected(_)));

        backend.update_cart_item(&earbuds, 2).await.unwrap();
        let cart = backend.add_to_cart(&speaker, 3).await.unwrap().cart;
        assert_eq!(cart.total_items, 5);
        assert_eq!(cart.line_items.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let backend = MemoryCommerce::with_demo_catalog();
        let err = backend
            .add_to_cart(&ProductId::new("prod_missing"), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(_)));

        let err = backend
            .remove_cart_item(&ProductId::new("prod_headphones"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_capture_consumes_token_and_retires_cart() {
        let backend = MemoryCommerce::with_demo_catalog();
        backend
            .add_to_cart(&ProductId::new("prod_speaker"), 1)
            .await
            .unwrap();
        let old_cart = backend.retrieve_cart().await.unwrap();
        let token = backend.generate_token().unwrap();

        let order = backend
            .capture_checkout(&token, &draft("4242424242424242"))
            .await
            .unwrap();
        assert_eq!(order.checkout_token_id, token);
        assert_eq!(order.cart_id.as_ref(), Some(&old_cart.id));
        assert_eq!(backend.orders().len(), 1);

        let again = backend
            .capture_checkout(&token, &draft("4242424242424242"))
            .await
            .unwrap_err();
        assert!(matches!(again, CommerceError::NotFound(_)));

        let new_cart = backend.retrieve_cart().await.unwrap();
        assert_ne!(new_cart.id, old_cart.id);
        assert!(new_cart.is_empty());
    }

    #[tokio::test]
    async fn test_declined_card_keeps_token_open() {
        let backend = MemoryCommerce::with_demo_catalog();
        backend
            .add_to_cart(&ProductId::new("prod_speaker"), 1)
            .await
            .unwrap();
        let token = backend.generate_token().unwrap();

        let err = backend
            .capture_checkout(&token, &draft(DECLINED_CARD))
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Card declined");

        assert!(
            backend
                .capture_checkout(&token, &draft("4242424242424242"))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_generate_token_requires_items() {
        let backend = MemoryCommerce::with_demo_catalog();
        assert!(matches!(
            backend.generate_token(),
            Err(CommerceError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_injected_failure_applies_once() {
        let backend = MemoryCommerce::with_demo_catalog();
        backend.fail_next(Operation::EmptyCart, "backend unavailable");

        let err = backend.empty_cart().await.unwrap_err();
        assert_eq!(err.user_message(), "backend unavailable");
        assert!(backend.empty_cart().await.is_ok());
        assert_eq!(backend.calls(Operation::EmptyCart), 2);
    }
}
