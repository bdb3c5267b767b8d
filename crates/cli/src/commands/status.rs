//! Whole-snapshot view.

use tracing::info;

use cartsync_storefront::commerce::CommerceGateway;
use cartsync_storefront::controller::CartController;

use super::print_json;

/// Print every slot of the snapshot.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be printed.
pub fn show<G: CommerceGateway>(
    controller: &CartController<G>,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = controller.snapshot();
    info!(slots = ?snapshot.slot_states(), "Snapshot");
    print_json(&snapshot)?;
    Ok(())
}
