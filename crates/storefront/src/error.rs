//! Error reporting with Sentry integration.
//!
//! Cart intents leave breadcrumbs; failures that nothing recovers from are
//! captured as Sentry events before they are handed back to the caller.

use crate::commerce::CommerceError;

/// Capture an unrecovered commerce failure to Sentry and log it.
///
/// The error is only reported here, never consumed; callers still return it.
pub fn report_error(operation: &str, error: &CommerceError) {
    let event_id = sentry::capture_error(error);
    tracing::error!(
        operation,
        error = %error,
        sentry_event_id = %event_id,
        "Commerce operation failed"
    );
}

/// Add a breadcrumb for a shopper action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// actions leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "prod_123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reporting_without_sentry_client_is_noop() {
        // No client bound: both calls must be safe to make from any context.
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "prod_1")]));
        report_error("add_to_cart", &CommerceError::RateLimited(5));
    }
}
