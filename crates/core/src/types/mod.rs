//! Newtype wrappers for domain values.
//!
//! Each type validates on construction so that invalid values cannot be
//! represented past the parsing boundary.

mod api_key;
mod email;
mod shop_domain;
mod status;

pub use api_key::{ApiKey, ApiKeyError};
pub use email::{Email, EmailError};
pub use shop_domain::{ShopDomain, ShopDomainError};
pub use status::SyncStatus;
