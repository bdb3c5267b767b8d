//! Catalog listing.

use tracing::info;

use cartsync_storefront::commerce::CommerceGateway;
use cartsync_storefront::controller::CartController;

use super::print_json;

/// Print the loaded catalog.
///
/// # Errors
///
/// Returns an error if the catalog never loaded or cannot be printed.
pub fn list<G: CommerceGateway>(
    controller: &CartController<G>,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = controller.snapshot();
    let products = snapshot.products.ok_or("Catalog not loaded")?;

    info!(count = products.len(), "Catalog loaded");
    print_json(&products)?;
    Ok(())
}
