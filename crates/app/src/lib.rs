//! Shipeu connector library.
//!
//! Exposes the app as a library so the HTTP clients and reshaping logic can
//! be exercised by tests; the `shipeu-app` binary wires it to a socket.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod shipeu;
pub mod shopify;
pub mod state;
