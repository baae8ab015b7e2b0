//! Store session repository.
//!
//! Queries are runtime-checked (`sqlx::query_as` + `bind`) so the crate
//! builds without a live database; the row shape is pinned by the
//! `store_session` migration.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use shipeu_core::{ApiKey, Email, ShopDomain, SyncStatus};
use sqlx::PgPool;

use super::RepositoryError;
use crate::models::StoreSession;

/// Internal row type for `PostgreSQL` queries.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    shop: ShopDomain,
    access_token: String,
    scope: String,
    api_key: Option<String>,
    api_key_expires: Option<DateTime<Utc>>,
    shipeu_status: SyncStatus,
    shipeu_email: Option<Email>,
    shipeu_store_id: Option<String>,
    shipeu_location_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for StoreSession {
    type Error = RepositoryError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let api_key = row
            .api_key
            .map(|k| ApiKey::parse(&k))
            .transpose()
            .map_err(|e| RepositoryError::DataCorruption(format!("stored api_key: {e}")))?;

        Ok(Self {
            shop: row.shop,
            access_token: SecretString::from(row.access_token),
            scope: row.scope,
            api_key,
            api_key_expires: row.api_key_expires,
            shipeu_status: row.shipeu_status,
            shipeu_email: row.shipeu_email,
            shipeu_store_id: row.shipeu_store_id,
            shipeu_location_id: row.shipeu_location_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "shop, access_token, scope, api_key, api_key_expires, \
     shipeu_status, shipeu_email, shipeu_store_id, shipeu_location_id, \
     created_at, updated_at";

/// Repository for store session database operations.
pub struct SessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> SessionRepository<'a> {
    /// Create a new session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create or refresh the session row for a shop after OAuth.
    ///
    /// Reinstalls update the token and scopes but keep the Shipeu
    /// registration fields the merchant already configured.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn upsert_install(
        &self,
        shop: &ShopDomain,
        access_token: &str,
        scope: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO store_session (shop, access_token, scope) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (shop) DO UPDATE SET \
                 access_token = EXCLUDED.access_token, \
                 scope        = EXCLUDED.scope, \
                 updated_at   = NOW()",
        )
        .bind(shop)
        .bind(access_token)
        .bind(scope)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get the session for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored value no longer parses.
    pub async fn get_by_shop(
        &self,
        shop: &ShopDomain,
    ) -> Result<Option<StoreSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM store_session WHERE shop = $1"
        ))
        .bind(shop)
        .fetch_optional(self.pool)
        .await?;

        row.map(StoreSession::try_from).transpose()
    }

    /// Get the session holding a live (non-expired) API key.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `DataCorruption` if a stored value no longer parses.
    pub async fn get_by_api_key(
        &self,
        api_key: &ApiKey,
    ) -> Result<Option<StoreSession>, RepositoryError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!(
            "SELECT {SELECT_COLUMNS} FROM store_session \
             WHERE api_key = $1 \
               AND (api_key_expires IS NULL OR api_key_expires > NOW())"
        ))
        .bind(api_key.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(StoreSession::try_from).transpose()
    }

    /// Store a newly issued API key and sync status for a shop.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no session exists for the shop.
    pub async fn set_api_key(
        &self,
        shop: &ShopDomain,
        api_key: &ApiKey,
        expires: Option<DateTime<Utc>>,
        status: SyncStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store_session SET \
                 api_key         = $2, \
                 api_key_expires = $3, \
                 shipeu_status   = $4, \
                 updated_at      = NOW() \
             WHERE shop = $1",
        )
        .bind(shop)
        .bind(api_key.as_str())
        .bind(expires)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Persist the outcome of a Shipeu registration or sync.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no session exists for the shop.
    pub async fn set_registration(
        &self,
        shop: &ShopDomain,
        api_key: &ApiKey,
        store_id: Option<&str>,
        email: &Email,
        status: SyncStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store_session SET \
                 api_key         = $2, \
                 shipeu_store_id = COALESCE($3, shipeu_store_id), \
                 shipeu_email    = $4, \
                 shipeu_status   = $5, \
                 updated_at      = NOW() \
             WHERE shop = $1",
        )
        .bind(shop)
        .bind(api_key.as_str())
        .bind(store_id)
        .bind(email)
        .bind(status)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Persist the configured fulfillment location.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no session exists for the shop.
    pub async fn set_location(
        &self,
        shop: &ShopDomain,
        location_id: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE store_session SET \
                 shipeu_location_id = $2, \
                 updated_at         = NOW() \
             WHERE shop = $1",
        )
        .bind(shop)
        .bind(location_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete every session row for a shop (app uninstall).
    ///
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_by_shop(&self, shop: &ShopDomain) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM store_session WHERE shop = $1")
            .bind(shop)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Check whether a shop has a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn exists(&self, shop: &ShopDomain) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM store_session WHERE shop = $1)",
        )
        .bind(shop)
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }
}
