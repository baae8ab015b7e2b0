//! Request middleware and auth guards.

pub mod api_key;
pub mod session;

pub use api_key::authenticate_api_key;
pub use session::create_session_layer;
