//! On-disk form of the portal's cookies.
//!
//! The login page hands out anti-automation cookies that must accompany later
//! API calls. They are snapshotted from the client's cookie store into the
//! session file and replayed into a fresh store when the session is resumed.

use std::fmt;

use chrono::{DateTime, Datelike, Utc};
use cookie_store::{CookieExpiration, CookieStore, RawCookie};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A single persisted cookie.
///
/// Keys are PascalCase to stay readable by and from session files written by
/// the earlier `bcaqr` tool. The value is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    /// Empty means `/`
    #[serde(default)]
    pub path: String,
    /// Empty means host-only on the session's base URL
    #[serde(default)]
    pub domain: String,
    /// `None` for session cookies
    #[serde(default, deserialize_with = "deserialize_expiry")]
    pub expires: Option<DateTime<Utc>>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

impl fmt::Debug for StoredCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredCookie")
            .field("name", &self.name)
            .field("value", &"[REDACTED]")
            .field("path", &self.path)
            .field("domain", &self.domain)
            .field("expires", &self.expires)
            .field("secure", &self.secure)
            .field("http_only", &self.http_only)
            .finish()
    }
}

impl StoredCookie {
    /// Session cookie with no flags.
    pub fn new(name: &str, value: &str, domain: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
            path: path.to_string(),
            domain: domain.to_string(),
            expires: None,
            secure: false,
            http_only: false,
        }
    }

    /// Convert a cookie held by the client's store. Host-only cookies carry
    /// no Domain attribute, so `host` (the URL they were matched against)
    /// fills it in.
    ///
    /// The expiry is the one the store fixed on receipt, so `Max-Age`
    /// counts from when the portal sent the cookie.
    pub fn from_store_cookie(cookie: &cookie_store::Cookie<'_>, host: &str) -> Self {
        let expires = match &cookie.expires {
            CookieExpiration::AtUtc(at) => DateTime::from_timestamp(at.unix_timestamp(), 0),
            CookieExpiration::SessionEnd => None,
        };
        let raw: &RawCookie<'_> = cookie;

        Self {
            name: raw.name().to_string(),
            value: raw.value().to_string(),
            path: raw.path().unwrap_or("/").to_string(),
            domain: raw.domain().unwrap_or(host).to_string(),
            expires,
            secure: raw.secure().unwrap_or(false),
            http_only: raw.http_only().unwrap_or(false),
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires.map(|at| at <= now).unwrap_or(false)
    }

    /// Render as a `Set-Cookie` header value for replay against `base`.
    /// Cookies whose domain is the base host are replayed host-only.
    pub fn to_set_cookie_string(&self, base: &Url) -> String {
        let path = if self.path.is_empty() { "/" } else { self.path.as_str() };
        let mut header = format!("{}={}; Path={}", self.name, self.value, path);

        let domain = self.domain.trim_start_matches('.');
        if !domain.is_empty() && Some(domain) != base.host_str() {
            header.push_str(&format!("; Domain={}", domain));
        }
        if let Some(expires) = self.expires {
            header.push_str(&format!(
                "; Expires={}",
                expires.format("%a, %d %b %Y %H:%M:%S GMT")
            ));
        }
        if self.secure {
            header.push_str("; Secure");
        }
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        header
    }
}

/// Snapshot the cookies the store would send to `base`.
pub fn snapshot_cookies(store: &CookieStore, base: &Url) -> Vec<StoredCookie> {
    let host = base.host_str().unwrap_or_default();
    store
        .matches(base)
        .into_iter()
        .map(|cookie| StoredCookie::from_store_cookie(cookie, host))
        .collect()
}

/// Build a cookie store holding the given cookies, scoped to `base`.
/// Expired or rejected cookies are skipped.
pub fn restore_cookies(cookies: &[StoredCookie], base: &Url) -> CookieStore {
    let mut store = CookieStore::default();
    let now = Utc::now();

    for cookie in cookies {
        if cookie.is_expired_at(now) {
            debug!(name = %cookie.name, "Skipping expired cookie");
            continue;
        }
        if let Err(e) = store.parse(&cookie.to_set_cookie_string(base), base) {
            debug!(name = %cookie.name, error = %e, "Skipping cookie rejected by store");
        }
    }

    store
}

// The earlier tool wrote Go's zero time for session cookies
fn deserialize_expiry<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<DateTime<Utc>> = Option::deserialize(deserializer)?;
    Ok(value.filter(|at| at.year() > 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base() -> Url {
        Url::parse("https://qr.klikbca.com").unwrap()
    }

    #[test]
    fn test_host_only_cookie_omits_domain() {
        let cookie = StoredCookie::new("TS01", "abc", "qr.klikbca.com", "/");
        assert_eq!(cookie.to_set_cookie_string(&base()), "TS01=abc; Path=/");
    }

    #[test]
    fn test_empty_path_and_domain_default() {
        let cookie = StoredCookie::new("TS01", "abc", "", "");
        assert_eq!(cookie.to_set_cookie_string(&base()), "TS01=abc; Path=/");
    }

    #[test]
    fn test_parent_domain_and_flags() {
        let mut cookie = StoredCookie::new("sid", "xyz", ".klikbca.com", "/api");
        cookie.expires = Some(DateTime::from_timestamp(1_893_456_000, 0).unwrap());
        cookie.secure = true;
        cookie.http_only = true;

        assert_eq!(
            cookie.to_set_cookie_string(&base()),
            "sid=xyz; Path=/api; Domain=klikbca.com; Expires=Tue, 01 Jan 2030 00:00:00 GMT; Secure; HttpOnly"
        );
    }

    #[test]
    fn test_restore_then_snapshot() {
        let cookies = vec![
            StoredCookie::new("TS01", "abc", "qr.klikbca.com", "/"),
            StoredCookie::new("lang", "id", "", "/"),
        ];
        let store = restore_cookies(&cookies, &base());
        let mut restored = snapshot_cookies(&store, &base());
        restored.sort_by(|a, b| a.name.cmp(&b.name));

        assert_eq!(restored.len(), 2);
        assert_eq!(restored[0].name, "TS01");
        assert_eq!(restored[0].value, "abc");
        assert_eq!(restored[0].domain, "qr.klikbca.com");
        assert_eq!(restored[1].name, "lang");
    }

    #[test]
    fn test_restore_skips_expired() {
        let mut stale = StoredCookie::new("old", "1", "qr.klikbca.com", "/");
        stale.expires = Some(Utc::now() - Duration::hours(1));
        let fresh = StoredCookie::new("new", "2", "qr.klikbca.com", "/");

        let store = restore_cookies(&[stale, fresh], &base());
        let names: Vec<String> = snapshot_cookies(&store, &base())
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["new".to_string()]);
    }

    #[test]
    fn test_snapshot_keeps_expiry_fixed_on_receipt() {
        let mut cookie = cookie_store::Cookie::parse("TS01=abc; Max-Age=3600", &base()).unwrap();
        // As if received long enough ago that only a minute of Max-Age is left
        cookie.expires = CookieExpiration::from(60u64);

        let stored = StoredCookie::from_store_cookie(&cookie, "qr.klikbca.com");
        let expires = stored.expires.expect("max-age cookie has an expiry");
        assert!(expires <= Utc::now() + Duration::seconds(61), "{expires}");
        assert!(expires > Utc::now());
    }

    #[test]
    fn test_session_cookie_has_no_expiry() {
        let cookie = cookie_store::Cookie::parse("TS01=abc; Path=/", &base()).unwrap();
        let stored = StoredCookie::from_store_cookie(&cookie, "qr.klikbca.com");
        assert_eq!(stored.expires, None);
    }

    #[test]
    fn test_zero_time_expiry_is_session_cookie() {
        let cookie: StoredCookie = serde_json::from_str(
            r#"{"Name":"a","Value":"b","Expires":"0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(cookie.expires, None);
        assert_eq!(cookie.path, "");
        assert!(!cookie.secure);
    }

    #[test]
    fn test_debug_redacts_value() {
        let cookie = StoredCookie::new("TS01", "super-secret", "qr.klikbca.com", "/");
        let debug = format!("{:?}", cookie);
        assert!(!debug.contains("super-secret"));
    }
}
