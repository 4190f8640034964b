//! Freshness policy for cached perishable values.

use chrono::{DateTime, Duration, Utc};

use super::token::Token;

/// True when something expiring at `expires_at` may still be used at `now`,
/// keeping `skew` in reserve: `now < expires_at - skew`.
#[must_use]
pub fn is_fresh(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>, skew: Duration) -> bool {
    match expires_at {
        Some(at) => at
            .checked_sub_signed(skew)
            .is_some_and(|deadline| now < deadline),
        None => false,
    }
}

/// True when the token carries a value that is fresh under `skew`.
#[must_use]
pub fn token_is_fresh(token: &Token, now: DateTime<Utc>, skew: Duration) -> bool {
    token.is_present() && is_fresh(token.expires_at(), now, skew)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inside_margin_is_fresh() {
        let now = Utc::now();
        let expires = now + Duration::seconds(120);
        let skew = Duration::seconds(60);

        assert!(is_fresh(Some(expires), now + Duration::seconds(30), skew));
        assert!(!is_fresh(Some(expires), now + Duration::seconds(65), skew));
    }

    #[test]
    fn test_deadline_itself_is_stale() {
        let now = Utc::now();
        let expires = now + Duration::seconds(60);
        assert!(!is_fresh(Some(expires), now, Duration::seconds(60)));
    }

    #[test]
    fn test_missing_expiry_is_stale() {
        assert!(!is_fresh(None, Utc::now(), Duration::zero()));
    }

    #[test]
    fn test_cleared_token_is_never_fresh() {
        let now = Utc::now();
        assert!(!token_is_fresh(&Token::cleared(None), now, Duration::zero()));
        assert!(token_is_fresh(
            &Token::issued("abc", now + Duration::minutes(5), 0),
            now,
            Duration::seconds(60)
        ));
    }
}
