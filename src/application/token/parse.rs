//! Login response parsing and expiry derivation.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use crate::domain::coerce::parse_datetime;
use crate::error::AuthFailure;
use crate::port::LoginReply;

/// Absolute expiry fields, in order of preference.
const EXPIRY_FIELDS: [&str; 3] = ["expiresAt", "expireAt", "validUntil"];
/// Relative time-to-live fields (seconds), in order of preference.
const TTL_FIELDS: [&str; 2] = ["ttl", "expiresIn"];

/// A successful login, ready to be cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginGrant {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub retcode: i64,
}

/// Turn a login reply into a grant.
///
/// An unparsable body is treated as empty and then judged by the HTTP
/// status. Success needs a 2xx status, `retcode == 0` and a non-empty
/// `payload.sessiontoken`.
///
/// Expiry precedence: an absolute expiry field, then a relative TTL added to
/// `now`, then `now + default_lifetime`.
pub fn parse_login(
    reply: &LoginReply,
    now: DateTime<Utc>,
    default_lifetime: Duration,
) -> Result<LoginGrant, AuthFailure> {
    let body: Value = serde_json::from_str(&reply.body).unwrap_or(Value::Null);
    let retcode = body.get("retcode").and_then(as_i64);
    let fail = |message: String| AuthFailure {
        message,
        status_code: reply.status,
        retcode,
    };

    if !reply.is_success() {
        return Err(fail(format!("login service returned HTTP {}", reply.status)));
    }
    match retcode {
        Some(0) => {}
        Some(code) => return Err(fail(format!("login rejected with retcode {code}"))),
        None => return Err(fail("login response carried no retcode".into())),
    }

    let payload = body.get("payload").unwrap_or(&Value::Null);
    let token = payload
        .get("sessiontoken")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| fail("login response carried no session token".into()))?;

    let expires_at = match absolute_expiry(payload) {
        Some(at) if at <= now => {
            return Err(fail(format!("login returned an already expired token ({at})")));
        }
        Some(at) => at,
        None => relative_expiry(payload, now).unwrap_or(now + default_lifetime),
    };

    Ok(LoginGrant {
        token: token.to_string(),
        expires_at,
        retcode: 0,
    })
}

fn absolute_expiry(payload: &Value) -> Option<DateTime<Utc>> {
    EXPIRY_FIELDS
        .iter()
        .filter_map(|field| payload.get(field).and_then(Value::as_str))
        .find_map(parse_datetime)
}

fn relative_expiry(payload: &Value, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = TTL_FIELDS
        .iter()
        .filter_map(|field| payload.get(field).and_then(as_f64))
        .find(|secs| secs.is_finite() && *secs > 0.0)?;
    // Millisecond precision; the cast saturates for absurd values.
    let millis = (secs * 1000.0) as i64;
    now.checked_add_signed(Duration::milliseconds(millis))
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn parse(status: u16, body: &str) -> Result<LoginGrant, AuthFailure> {
        parse_login(&LoginReply::new(status, body), now(), Duration::minutes(30))
    }

    #[test]
    fn test_ttl_is_added_to_now() {
        let grant = parse(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc","ttl":60}}"#).unwrap();
        assert_eq!(grant.token, "abc");
        assert_eq!(grant.expires_at, now() + Duration::seconds(60));
    }

    #[test]
    fn test_absolute_expiry_wins_over_ttl() {
        let grant = parse(
            200,
            r#"{"retcode":0,"payload":{"sessiontoken":"abc","validUntil":"2024-05-01T13:00:00Z","ttl":60}}"#,
        )
        .unwrap();
        assert_eq!(grant.expires_at, Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_unparsable_expiry_falls_through_to_ttl() {
        let grant = parse(
            200,
            r#"{"retcode":0,"payload":{"sessiontoken":"abc","expiresAt":"soon","expiresIn":"90"}}"#,
        )
        .unwrap();
        assert_eq!(grant.expires_at, now() + Duration::seconds(90));
    }

    #[test]
    fn test_default_lifetime_without_expiry_fields() {
        let grant = parse(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc"}}"#).unwrap();
        assert_eq!(grant.expires_at, now() + Duration::minutes(30));
    }

    #[test]
    fn test_non_positive_ttl_is_ignored() {
        let grant = parse(200, r#"{"retcode":0,"payload":{"sessiontoken":"abc","ttl":0}}"#).unwrap();
        assert_eq!(grant.expires_at, now() + Duration::minutes(30));
    }

    #[test]
    fn test_past_absolute_expiry_is_a_failure() {
        let failure = parse(
            200,
            r#"{"retcode":0,"payload":{"sessiontoken":"abc","expiresAt":"2024-05-01T11:00:00Z"}}"#,
        )
        .unwrap_err();
        assert_eq!(failure.retcode, Some(0));
    }

    #[test]
    fn test_bad_retcode_is_kept_for_diagnostics() {
        let failure = parse(200, r#"{"retcode":17,"payload":{"sessiontoken":"abc"}}"#).unwrap_err();
        assert_eq!(failure.retcode, Some(17));
        assert_eq!(failure.status_code, 200);
    }

    #[test]
    fn test_missing_token_is_a_failure() {
        assert!(parse(200, r#"{"retcode":0,"payload":{"sessiontoken":""}}"#).is_err());
        assert!(parse(200, r#"{"retcode":0}"#).is_err());
    }

    #[test]
    fn test_unparsable_body_is_judged_by_status() {
        let failure = parse(200, "<html>").unwrap_err();
        assert_eq!(failure.retcode, None);

        let failure = parse(503, "<html>").unwrap_err();
        assert_eq!(failure.status_code, 503);
        assert!(failure.message.contains("503"));
    }
}
