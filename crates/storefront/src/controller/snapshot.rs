//! The controller's view of backend state.

use serde::Serialize;

use crate::commerce::{Cart, Order, ProductCatalog};

/// Lifecycle of a snapshot slot.
///
/// Slots start `Empty` and become `Populated` on their first successful
/// fetch or mutation. They never go back to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Empty,
    Populated,
}

impl<T> From<&Option<T>> for SlotState {
    fn from(slot: &Option<T>) -> Self {
        if slot.is_some() {
            Self::Populated
        } else {
            Self::Empty
        }
    }
}

/// Current catalog, cart, order and last checkout error.
///
/// Each slot is only ever replaced as a whole with a value from the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    /// Product catalog, in backend order.
    pub products: Option<ProductCatalog>,
    /// Cart as last returned by the backend.
    pub cart: Option<Cart>,
    /// Most recently captured order.
    pub order: Option<Order>,
    /// Message from the most recent failed checkout capture.
    pub error: Option<String>,
}

impl Snapshot {
    /// Units in the cart as reported by the backend (0 before the cart loads).
    #[must_use]
    pub fn total_items(&self) -> u32 {
        self.cart.as_ref().map_or(0, |c| c.total_items)
    }

    /// State of each slot: products, cart, order, error.
    #[must_use]
    pub fn slot_states(&self) -> [SlotState; 4] {
        [
            (&self.products).into(),
            (&self.cart).into(),
            (&self.order).into(),
            (&self.error).into(),
        ]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_all_empty() {
        let snapshot = Snapshot::default();
        assert_eq!(snapshot.slot_states(), [SlotState::Empty; 4]);
        assert_eq!(snapshot.total_items(), 0);
    }

    #[test]
    fn test_snapshot_serializes_every_slot() {
        let snapshot = Snapshot {
            error: Some("Card declined".to_string()),
            ..Snapshot::default()
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "products": null,
                "cart": null,
                "order": null,
                "error": "Card declined"
            })
        );
    }

    #[test]
    fn test_error_slot_populated() {
        let snapshot = Snapshot {
            error: Some("Card declined".to_string()),
            ..Snapshot::default()
        };
        assert_eq!(
            snapshot.slot_states(),
            [
                SlotState::Empty,
                SlotState::Empty,
                SlotState::Empty,
                SlotState::Populated
            ]
        );
    }
}
