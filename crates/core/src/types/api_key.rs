//! Opaque API key type.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Errors that can occur when parsing an [`ApiKey`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum ApiKeyError {
    /// The input string is empty.
    #[error("API key cannot be empty")]
    Empty,
    /// The input string is too short to be a real key.
    #[error("API key must be longer than {min} characters")]
    TooShort {
        /// Minimum required length (exclusive).
        min: usize,
    },
    /// The input string is too long.
    #[error("API key must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or control characters.
    #[error("API key may not contain whitespace or control characters")]
    InvalidCharacters,
}

/// An opaque bearer API key.
///
/// Keys are issued to merchants for the `/api/*` endpoints and for the
/// Shipeu platform to call back with. Locally minted keys are UUID v4;
/// keys issued by Shipeu are accepted as-is, so parsing only enforces a
/// plausible shape, not a specific format.
///
/// The `Debug` impl redacts the key; use [`ApiKey::as_str`] where the raw
/// value is genuinely needed (HTTP headers, the settings page reveal).
///
/// ## Examples
///
/// ```
/// use shipeu_core::ApiKey;
///
/// let key = ApiKey::generate();
/// assert_eq!(ApiKey::parse(key.as_str()).unwrap(), key);
/// assert!(ApiKey::parse("short").is_err());
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    /// Keys at or below this length are rejected.
    pub const MIN_LENGTH: usize = 10;

    /// Maximum length of an API key.
    pub const MAX_LENGTH: usize = 128;

    /// Mint a fresh random key (UUID v4, hyphenated).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Parse an `ApiKey` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, 10 characters or fewer,
    /// longer than 128 characters, or contains whitespace/control
    /// characters.
    pub fn parse(s: &str) -> Result<Self, ApiKeyError> {
        if s.is_empty() {
            return Err(ApiKeyError::Empty);
        }

        if s.len() <= Self::MIN_LENGTH {
            return Err(ApiKeyError::TooShort {
                min: Self::MIN_LENGTH,
            });
        }

        if s.len() > Self::MAX_LENGTH {
            return Err(ApiKeyError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ApiKeyError::InvalidCharacters);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the raw key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `ApiKey` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Returns a masked rendering for display (`1234…cdef`).
    #[must_use]
    pub fn masked(&self) -> String {
        if self.0.len() <= 8 {
            return "…".to_string();
        }
        let head: String = self.0.chars().take(4).collect();
        let tail: String = self
            .0
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("{head}…{tail}")
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

impl std::str::FromStr for ApiKey {
    type Err = ApiKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
