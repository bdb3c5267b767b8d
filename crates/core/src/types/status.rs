//! Status enums for captured orders.

use serde::{Deserialize, Serialize};

/// Order payment status.
///
/// Maps to the backend's `status_payment` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    NotPaid,
    PartiallyPaid,
    Paid,
    Refunded,
}

/// Order fulfillment status.
///
/// Maps to the backend's `status_fulfillment` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FulfillmentStatus {
    #[default]
    NotFulfilled,
    Partial,
    Fulfilled,
    Returned,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotPaid => write!(f, "not_paid"),
            Self::PartiallyPaid => write!(f, "partially_paid"),
            Self::Paid => write!(f, "paid"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFulfilled => write!(f, "not_fulfilled"),
            Self::Partial => write!(f, "partial"),
            Self::Fulfilled => write!(f, "fulfilled"),
            Self::Returned => write!(f, "returned"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_status_wire_format() {
        let status: PaymentStatus = serde_json::from_str("\"not_paid\"").unwrap();
        assert_eq!(status, PaymentStatus::NotPaid);
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"paid\"");
    }

    #[test]
    fn test_display_matches_wire_format() {
        for status in [
            FulfillmentStatus::NotFulfilled,
            FulfillmentStatus::Partial,
            FulfillmentStatus::Fulfilled,
            FulfillmentStatus::Returned,
        ] {
            let wire = serde_json::to_string(&status).unwrap();
            assert_eq!(wire, format!("\"{status}\""));
        }
    }
}
