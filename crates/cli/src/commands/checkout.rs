//! Checkout capture.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use cartsync_core::CheckoutTokenId;
use cartsync_storefront::commerce::{Cart, CommerceGateway, Order, OrderDraft};
use cartsync_storefront::controller::{CartController, CheckoutOutcome};

use super::print_json;

/// What a checkout run prints: the order, cart and error slots.
#[derive(Serialize)]
struct CheckoutView<'a> {
    order: Option<&'a Order>,
    cart: Option<&'a Cart>,
    error: Option<&'a str>,
}

/// Capture an order for `token` using the draft stored at `draft_path`.
///
/// A declined capture is not a command failure: the backend's message is
/// printed in the `error` field and the process exits normally.
///
/// # Errors
///
/// Returns an error if the draft cannot be read or parsed, or if the cart
/// refresh after a successful capture fails.
pub async fn capture<G: CommerceGateway>(
    controller: &CartController<G>,
    token: &str,
    draft_path: &Path,
) -> Result<(), Box<dyn std::error::Error>> {
    if !draft_path.exists() {
        return Err(format!("File not found: {}", draft_path.display()).into());
    }

    let content = tokio::fs::read_to_string(draft_path).await?;
    let draft: OrderDraft = serde_json::from_str(&content)?;
    info!(path = %draft_path.display(), "Loaded order draft");

    let token = CheckoutTokenId::new(token);
    match controller.capture_checkout(&token, &draft).await? {
        CheckoutOutcome::Captured(order) => {
            info!(order_id = %order.id, reference = %order.customer_reference, "Order captured");
        }
        CheckoutOutcome::Failed(message) => warn!(%message, "Checkout not captured"),
    }

    let snapshot = controller.snapshot();
    print_json(&CheckoutView {
        order: snapshot.order.as_ref(),
        cart: snapshot.cart.as_ref(),
        error: snapshot.error.as_deref(),
    })?;
    Ok(())
}
