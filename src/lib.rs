//! Ephemeral Token Service gateway.
//!
//! A public HTTP proxy that mints short-lived, sender-constrained access
//! tokens for browser clients and forwards proven requests to a single
//! upstream API, attaching a service credential the browser never sees.
//! Every forwarded request must present both a bearer and a single-use
//! DPoP proof signed by the key the bearer was issued to.

pub mod api;
pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
