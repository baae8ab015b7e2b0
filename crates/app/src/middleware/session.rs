//! Cookie session configuration.
//!
//! Sessions are only used to hold the OAuth state nonce during the install
//! flow, backed by `PostgreSQL` via tower-sessions.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::AppConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "shipeu_session";

/// Session expiry time in seconds (1 hour; the nonce is consumed within
/// one OAuth round trip).
const SESSION_EXPIRY_SECONDS: i64 = 60 * 60;

/// Create the session layer with `PostgreSQL` store.
///
/// # Arguments
///
/// * `pool` - `PostgreSQL` connection pool
/// * `config` - App configuration (for determining HTTPS mode)
///
/// # Panics
///
/// Panics if the table name is invalid (cannot happen with the hardcoded
/// "web_session" value).
#[must_use]
pub fn create_session_layer(pool: &PgPool, config: &AppConfig) -> SessionManagerLayer<PostgresStore> {
    // The web_session table is created by the app migrations.
    let store = PostgresStore::new(pool.clone())
        .with_table_name("web_session")
        .expect("valid table name");

    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(is_secure)
        // SameSite=Lax: the OAuth callback arrives as a top-level redirect
        // from Shopify and must still carry the cookie with the nonce.
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
