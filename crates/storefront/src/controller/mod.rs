//! Cart/checkout state controller.
//!
//! Owns the in-memory [`Snapshot`] of catalog, cart, order and last checkout
//! error, and keeps it in step with the commerce backend. Every handler makes
//! one gateway call and then replaces the affected slot wholesale with what
//! the backend returned. Nothing is merged, patched or recomputed locally.
//!
//! # Ordering
//!
//! Handlers are not serialized. Two overlapping mutations both apply their
//! response when it arrives, so the cart shows whichever response completed
//! last, regardless of which intent was issued last.
//!
//! # Failures
//!
//! Only [`CartController::capture_checkout`] recovers failures, into the
//! snapshot's `error` slot. Every other handler hands the gateway error back
//! to the caller and leaves the snapshot as it was.

mod snapshot;


pub use snapshot::{SlotState, Snapshot};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use cartsync_core::{CheckoutTokenId, ProductId};

use crate::commerce::{Cart, CommerceError, CommerceGateway, Order, OrderDraft};
use crate::error::{add_breadcrumb, report_error};

/// A shopper action the view asks the controller to perform.
#[derive(Debug, Clone)]
pub enum Intent {
    AddToCart {
        product_id: ProductId,
        quantity: u32,
    },
    UpdateQuantity {
        product_id: ProductId,
        quantity: u32,
    },
    RemoveFromCart {
        product_id: ProductId,
    },
    EmptyCart,
    RefreshCart,
    CaptureCheckout {
        token: CheckoutTokenId,
        draft: Box<OrderDraft>,
    },
}

impl Intent {
    /// Short name used in logs and breadcrumbs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AddToCart { .. } => "add_to_cart",
            Self::UpdateQuantity { .. } => "update_quantity",
            Self::RemoveFromCart { .. } => "remove_from_cart",
            Self::EmptyCart => "empty_cart",
            Self::RefreshCart => "refresh_cart",
            Self::CaptureCheckout { .. } => "capture_checkout",
        }
    }
}

/// Result of a checkout capture attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutOutcome {
    /// The order was captured and the cart refreshed.
    Captured(Order),
    /// The backend refused the capture; the message is now in the snapshot.
    Failed(String),
}

/// The state controller.
///
/// Cheap to clone; clones share the same snapshot and gateway.
pub struct CartController<G> {
    inner: Arc<ControllerInner<G>>,
}

struct ControllerInner<G> {
    gateway: G,
    snapshot: watch::Sender<Snapshot>,
    loaded: AtomicBool,
}

impl<G> Clone for CartController<G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<G: CommerceGateway> CartController<G> {
    /// Create a controller with an empty snapshot.
    #[must_use]
    pub fn new(gateway: G) -> Self {
        let (snapshot, _) = watch::channel(Snapshot::default());
        Self {
            inner: Arc::new(ControllerInner {
                gateway,
                snapshot,
                loaded: AtomicBool::new(false),
            }),
        }
    }

    /// The gateway this controller talks to.
    #[must_use]
    pub fn gateway(&self) -> &G {
        &self.inner.gateway
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    ///
    /// The receiver is marked changed after every slot replacement.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.snapshot.subscribe()
    }

    /// Replace slots in one step so readers never see a partial update.
    fn replace(&self, slot: &'static str, apply: impl FnOnce(&mut Snapshot)) {
        self.inner.snapshot.send_modify(apply);
        debug!(slot, "Snapshot slot replaced");
    }

    fn replace_cart(&self, cart: Cart) {
        self.replace("cart", |s| s.cart = Some(cart));
    }

    // =========================================================================
    // Startup
    // =========================================================================

    /// Fetch the catalog and the cart concurrently.
    ///
    /// Each slot is replaced as soon as its own response arrives. Only the
    /// first call does anything; later calls return `Ok(())` immediately.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the catalog fetch failed, otherwise the
    /// cart error. A slot whose fetch succeeded is populated either way.
    #[instrument(skip(self))]
    pub async fn load_initial_state(&self) -> Result<(), CommerceError> {
        if self.inner.loaded.swap(true, Ordering::AcqRel) {
            debug!("Initial state already requested");
            return Ok(());
        }

        let products = async {
            let list = self.inner.gateway.list_products().await?;
            self.replace("products", |s| s.products = Some(list.data));
            Ok::<_, CommerceError>(())
        };
        let cart = async {
            let cart = self.inner.gateway.retrieve_cart().await?;
            self.replace_cart(cart);
            Ok::<_, CommerceError>(())
        };

        let (products_result, cart_result) = tokio::join!(products, cart);

        if let (Err(products_err), Err(cart_err)) = (&products_result, &cart_result) {
            warn!(
                products_error = %products_err,
                cart_error = %cart_err,
                "Catalog and cart both failed to load"
            );
        }

        products_result.and(cart_result)
    }

    // =========================================================================
    // Cart Mutations
    // =========================================================================

    /// Add `quantity` units of a product and show the cart the backend returns.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the snapshot is left unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        add_breadcrumb(
            "cart",
            "Add to cart",
            Some(&[("product_id", product_id.as_str())]),
        );
        let response = self.inner.gateway.add_to_cart(product_id, quantity).await?;
        self.replace_cart(response.cart);
        Ok(())
    }

    /// Set the line for a product to exactly `quantity`.
    ///
    /// A quantity of zero is sent as-is; the backend decides what it means.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the snapshot is left unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), CommerceError> {
        add_breadcrumb(
            "cart",
            "Update quantity",
            Some(&[("product_id", product_id.as_str())]),
        );
        let response = self
            .inner
            .gateway
            .update_cart_item(product_id, quantity)
            .await?;
        self.replace_cart(response.cart);
        Ok(())
    }

    /// Remove the line for a product.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the snapshot is left unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<(), CommerceError> {
        add_breadcrumb(
            "cart",
            "Remove from cart",
            Some(&[("product_id", product_id.as_str())]),
        );
        let response = self.inner.gateway.remove_cart_item(product_id).await?;
        self.replace_cart(response.cart);
        Ok(())
    }

    /// Remove every line from the cart.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn empty_cart(&self) -> Result<(), CommerceError> {
        add_breadcrumb("cart", "Empty cart", None);
        let response = self.inner.gateway.empty_cart().await?;
        self.replace_cart(response.cart);
        Ok(())
    }

    /// Replace the cart with a fresh one from the backend.
    ///
    /// # Errors
    ///
    /// Returns the gateway error; the snapshot is left unchanged.
    #[instrument(skip(self))]
    pub async fn refresh_cart(&self) -> Result<(), CommerceError> {
        let cart = self.inner.gateway.refresh_cart().await?;
        self.replace_cart(cart);
        Ok(())
    }

    // =========================================================================
    // Checkout
    // =========================================================================

    /// Capture an order for a checkout token.
    ///
    /// On success the order slot is replaced and the cart refreshed once,
    /// since the captured cart is no longer valid. The error slot is left as
    /// it was. On failure the backend's message goes into the error slot and
    /// nothing else changes.
    ///
    /// # Errors
    ///
    /// Capture failures are recovered into [`CheckoutOutcome::Failed`]. Only a
    /// failure of the follow-up cart refresh is returned as an error, after
    /// the order slot has already been replaced.
    #[instrument(skip(self, draft), fields(token = %token))]
    pub async fn capture_checkout(
        &self,
        token: &CheckoutTokenId,
        draft: &OrderDraft,
    ) -> Result<CheckoutOutcome, CommerceError> {
        add_breadcrumb("checkout", "Capture checkout", Some(&[("token", token.as_str())]));

        match self.inner.gateway.capture_checkout(token, draft).await {
            Ok(order) => {
                info!(order_id = %order.id, "Checkout captured");
                let captured = order.clone();
                self.replace("order", |s| s.order = Some(captured));
                self.refresh_cart().await?;
                Ok(CheckoutOutcome::Captured(order))
            }
            Err(err) => {
                let message = err.user_message();
                warn!(error = %err, "Checkout capture failed");
                let shown = message.clone();
                self.replace("error", |s| s.error = Some(shown));
                Ok(CheckoutOutcome::Failed(message))
            }
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Run the handler for an intent to completion.
    ///
    /// # Errors
    ///
    /// Returns whatever the handler returns.
    pub async fn handle(&self, intent: Intent) -> Result<(), CommerceError> {
        match intent {
            Intent::AddToCart {
                product_id,
                quantity,
            } => self.add_to_cart(&product_id, quantity).await,
            Intent::UpdateQuantity {
                product_id,
                quantity,
            } => self.update_quantity(&product_id, quantity).await,
            Intent::RemoveFromCart { product_id } => self.remove_from_cart(&product_id).await,
            Intent::EmptyCart => self.empty_cart().await,
            Intent::RefreshCart => self.refresh_cart().await,
            Intent::CaptureCheckout { token, draft } => {
                self.capture_checkout(&token, &draft).await.map(|_| ())
            }
        }
    }
}

impl<G: CommerceGateway + 'static> CartController<G> {
    /// Run an intent in the background.
    ///
    /// The view does not wait for the result; it observes the snapshot
    /// instead. Failures are reported to Sentry and still returned through
    /// the handle.
    pub fn dispatch(&self, intent: Intent) -> JoinHandle<Result<(), CommerceError>> {
        let controller = self.clone();
        tokio::spawn(async move {
            let name = intent.name();
            let result = controller.handle(intent).await;
            if let Err(err) = &result {
                report_error(name, err);
            }
            result
        })
    }
}
