//! Shipeu Core - Shared types library.
//!
//! This crate provides common types used across the Shipeu connector:
//! - `app` - The merchant-facing connector server
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for shop domains, emails, API keys, and
//!   sync statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
