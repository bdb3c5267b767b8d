//! cartsync storefront library.
//!
//! Keeps a storefront client's view of catalog, cart and order state in step
//! with a commerce REST backend:
//!
//! - [`commerce`] - gateway contract, HTTP client and in-process backend
//! - [`controller`] - the state controller the view talks to
//! - [`config`] - environment-driven client configuration
//! - [`error`] - Sentry reporting helpers

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod commerce;
pub mod config;
pub mod controller;
pub mod error;
