//! Subcommand implementations.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod status;

use serde::Serialize;

/// Print a snapshot slice to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
#[allow(clippy::print_stdout)]
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
