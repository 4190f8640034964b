//! Session token held by the token cache.

use chrono::{DateTime, Utc};

/// The cached login token.
///
/// `value` and `expires_at` are set or cleared together; the fields are
/// private so no other combination can be built.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Token {
    value: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    retcode: Option<i64>,
}

impl Token {
    /// A usable token.
    pub fn issued(value: impl Into<String>, expires_at: DateTime<Utc>, retcode: i64) -> Self {
        Self {
            value: Some(value.into()),
            expires_at: Some(expires_at),
            retcode: Some(retcode),
        }
    }

    /// No usable token, keeping the last return code for diagnostics.
    #[must_use]
    pub const fn cleared(retcode: Option<i64>) -> Self {
        Self {
            value: None,
            expires_at: None,
            retcode,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    #[must_use]
    pub const fn retcode(&self) -> Option<i64> {
        self.retcode
    }

    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.value.is_some()
    }
}
