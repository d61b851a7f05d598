//! `Cache-Control` and `Expires` handling.
//!
//! Freshness is recorded on the stored response itself: when a response is
//! cached, an `Expires` header is stamped from its `Date` plus the max-age.
//! Expiry checks then only need that one header.

use chrono::{DateTime, Duration, Utc};
use edge_core::{date, Response};
use http::header::{self, HeaderMap, HeaderValue};

/// Max-age in seconds advertised by a `Cache-Control` value.
///
/// Returns 0 (not cacheable) when the header is absent, contains `no-cache`,
/// or carries no numeric `max-age` / `s-maxage` directive. The first
/// directive with a numeric value wins.
pub fn max_age(cache_control: Option<&str>) -> u64 {
    let Some(value) = cache_control else {
        return 0;
    };
    if value.contains("no-cache") {
        return 0;
    }

    value
        .split(',')
        .filter_map(|directive| directive.trim().split_once('='))
        .filter(|(name, _)| {
            let name = name.trim();
            name.eq_ignore_ascii_case("max-age") || name.eq_ignore_ascii_case("s-maxage")
        })
        .find_map(|(_, secs)| secs.trim().trim_matches('"').parse::<u64>().ok())
        .unwrap_or(0)
}

/// Max-age of a response's `Cache-Control` header.
pub fn response_max_age(response: &Response) -> u64 {
    max_age(response.header(header::CACHE_CONTROL.as_str()))
}

/// Timestamp in the response's `Date` header.
pub fn response_date(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(header::DATE)
        .and_then(|v| v.to_str().ok())
        .and_then(date::parse_http_date)
}

/// Timestamp in the `Expires` header.
pub fn expires_at(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    headers
        .get(header::EXPIRES)
        .and_then(|v| v.to_str().ok())
        .and_then(date::parse_http_date)
}

/// `true` iff an `Expires` header is present and strictly earlier than `now`.
///
/// No `Expires` header means the entry never expires. An unparseable value
/// is treated the same way.
pub fn is_expired_at(headers: &HeaderMap, now: DateTime<Utc>) -> bool {
    expires_at(headers).is_some_and(|expires| expires < now)
}

/// [`is_expired_at`] against the current time.
pub fn is_expired(headers: &HeaderMap) -> bool {
    is_expired_at(headers, Utc::now())
}

/// Stamp `Expires = Date + max_age`.
///
/// A missing or unparseable `Date` header counts as "now".
pub fn stamp_expires(response: Response, max_age_secs: u64) -> Response {
    let base = response_date(response.headers()).unwrap_or_else(Utc::now);
    let secs = i64::try_from(max_age_secs).unwrap_or(i64::MAX);
    let expires = Duration::try_seconds(secs)
        .and_then(|ttl| base.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC);

    match HeaderValue::from_str(&date::format_http_date(expires)) {
        Ok(value) => response.with_header(header::EXPIRES, value),
        Err(_) => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use edge_core::StatusCode;

    fn dated(date: &'static str) -> Response {
        Response::new(StatusCode::OK).with_header(header::DATE, HeaderValue::from_static(date))
    }

    #[test]
    fn test_max_age_absent_or_no_cache() {
        assert_eq!(max_age(None), 0);
        assert_eq!(max_age(Some("no-cache")), 0);
        assert_eq!(max_age(Some("no-cache, max-age=60")), 0);
    }

    #[test]
    fn test_max_age_parsing() {
        assert_eq!(max_age(Some("max-age=86400")), 86400);
        assert_eq!(max_age(Some("public, max-age=600")), 600);
        assert_eq!(max_age(Some("s-maxage=30")), 30);
        assert_eq!(max_age(Some("s-maxage=30, max-age=10")), 30);
        assert_eq!(max_age(Some("max-age=0")), 0);
    }

    #[test]
    fn test_max_age_malformed_is_not_cacheable() {
        assert_eq!(max_age(Some("max-age")), 0);
        assert_eq!(max_age(Some("max-age=")), 0);
        assert_eq!(max_age(Some("max-age=soon")), 0);
        assert_eq!(max_age(Some("public")), 0);
    }

    #[test]
    fn test_max_age_skips_malformed_directive() {
        assert_eq!(max_age(Some("max-age=abc, s-maxage=15")), 15);
    }

    #[test]
    fn test_stamp_expires_from_date() {
        let response = stamp_expires(dated("Sun, 06 Nov 1994 08:49:37 GMT"), 86400);
        assert_eq!(
            response.header("expires"),
            Some("Mon, 07 Nov 1994 08:49:37 GMT")
        );
    }

    #[test]
    fn test_is_expired() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let past = stamp_expires(dated("Sun, 31 Dec 2023 00:00:00 GMT"), 60);
        let future = stamp_expires(dated("Sun, 31 Dec 2023 00:00:00 GMT"), 2 * 86400);

        assert!(is_expired_at(past.headers(), now));
        assert!(!is_expired_at(future.headers(), now));
    }

    #[test]
    fn test_no_expires_never_expires() {
        let response = dated("Thu, 01 Jan 1970 00:00:00 GMT");
        assert!(!is_expired(response.headers()));

        let garbage = Response::new(StatusCode::OK)
            .with_header(header::EXPIRES, HeaderValue::from_static("0"));
        assert!(!is_expired(garbage.headers()));
    }
}
