//! Cart commands.
//!
//! Each mutation goes through the controller and then prints the cart slot,
//! which holds exactly what the backend returned.

use tracing::info;

use cartsync_core::ProductId;
use cartsync_storefront::commerce::CommerceGateway;
use cartsync_storefront::controller::CartController;

use super::print_json;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Print the cart slot.
///
/// # Errors
///
/// Returns an error if the cart never loaded or cannot be printed.
pub fn show<G: CommerceGateway>(controller: &CartController<G>) -> CommandResult {
    let snapshot = controller.snapshot();
    let cart = snapshot.cart.as_ref().ok_or("Cart not loaded")?;

    info!(
        cart_id = %cart.id,
        total_items = snapshot.total_items(),
        "Cart"
    );
    print_json(cart)?;
    Ok(())
}

/// Add units of a product.
///
/// # Errors
///
/// Returns the backend error if the add fails.
pub async fn add<G: CommerceGateway>(
    controller: &CartController<G>,
    product: &str,
    quantity: u32,
) -> CommandResult {
    controller
        .add_to_cart(&ProductId::new(product), quantity)
        .await?;
    show(controller)
}

/// Set a product's quantity.
///
/// # Errors
///
/// Returns the backend error if the update fails.
pub async fn update<G: CommerceGateway>(
    controller: &CartController<G>,
    product: &str,
    quantity: u32,
) -> CommandResult {
    controller
        .update_quantity(&ProductId::new(product), quantity)
        .await?;
    show(controller)
}

/// Remove a product's line.
///
/// # Errors
///
/// Returns the backend error if the removal fails.
pub async fn remove<G: CommerceGateway>(
    controller: &CartController<G>,
    product: &str,
) -> CommandResult {
    controller.remove_from_cart(&ProductId::new(product)).await?;
    show(controller)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns the backend error if emptying fails.
pub async fn empty<G: CommerceGateway>(controller: &CartController<G>) -> CommandResult {
    controller.empty_cart().await?;
    show(controller)
}

/// Replace the cart with a fresh one.
///
/// # Errors
///
/// Returns the backend error if the refresh fails.
pub async fn refresh<G: CommerceGateway>(controller: &CartController<G>) -> CommandResult {
    controller.refresh_cart().await?;
    show(controller)
}
