//! `SessionId` cookie parsing and formatting.
//!
//! The outbound header shape is a wire contract with existing clients and
//! must not change:
//!
//! ```text
//! SessionId=<id>; path=<path>; expires=Fri, 05-Jan-2024 15:04:05 GMT;
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;

/// Name of the correlation cookie.
pub const SESSION_COOKIE_NAME: &str = "SessionId";

/// RFC-850 style date used in the `expires` attribute.
const EXPIRES_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S GMT";

/// Numeric-offset variant of [`EXPIRES_FORMAT`] accepted on input.
const EXPIRES_OFFSET_FORMAT: &str = "%a, %d-%b-%Y %H:%M:%S %z";

/// A parsed cookie header.
///
/// Reserved attributes land in the typed fields; every other `name=value`
/// pair is kept in `items`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieHeader {
    /// Ordinary cookie pairs
    pub items: HashMap<String, String>,
    /// `path` attribute
    pub path: Option<String>,
    /// `domain` attribute
    pub domain: Option<String>,
    /// `expires` attribute, if it parsed as a date
    pub expires: Option<DateTime<Utc>>,
    /// `secure` flag
    pub secure: bool,
    /// `HttpOnly` flag
    pub http_only: bool,
}

impl CookieHeader {
    /// Get a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items.get(name).map(String::as_str)
    }

    /// Check if a cookie is present.
    pub fn has(&self, name: &str) -> bool {
        self.items.contains_key(name)
    }

    /// The session id carried by this header, or `""` if there is none.
    pub fn session_id(&self) -> &str {
        self.get(SESSION_COOKIE_NAME).unwrap_or("")
    }
}

/// Parse a raw cookie header.
///
/// Never fails: fragments that are not `name=value` pairs or recognized
/// flags are skipped.
///
/// # Examples
///
/// ```
/// use armature_session_manager::cookie;
///
/// let header = cookie::parse("theme=dark; SessionId=abc123; path=/");
/// assert_eq!(header.session_id(), "abc123");
/// assert_eq!(header.get("theme"), Some("dark"));
/// assert_eq!(header.path.as_deref(), Some("/"));
/// ```
pub fn parse(raw: &str) -> CookieHeader {
    let mut header = CookieHeader::default();

    for fragment in raw.split(';') {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            continue;
        }

        let (name, value) = match fragment.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim())),
            None => (fragment, None),
        };
        if name.is_empty() {
            continue;
        }

        match (name.to_ascii_lowercase().as_str(), value) {
            ("path", Some(v)) => header.path = Some(v.to_string()),
            ("domain", Some(v)) => header.domain = Some(v.to_string()),
            ("expires", Some(v)) => header.expires = parse_expires(v),
            ("secure", _) => header.secure = true,
            ("httponly", _) => header.http_only = true,
            (_, Some(v)) => {
                header.items.insert(name.to_string(), v.to_string());
            }
            (_, None) => {}
        }
    }

    header
}

/// Extract the candidate session id from an optional cookie header.
///
/// Absent, malformed, or unrelated headers all yield `""`, which the store
/// treats as "create a new session".
pub fn candidate_id(raw: Option<&str>) -> String {
    raw.map(parse)
        .map(|header| header.session_id().to_string())
        .unwrap_or_default()
}

/// Render the `Set-Cookie` value for a session.
///
/// # Examples
///
/// ```
/// use armature_session_manager::cookie;
/// use chrono::{TimeZone, Utc};
///
/// let expires = Utc.with_ymd_and_hms(2024, 1, 5, 15, 4, 5).unwrap();
/// assert_eq!(
///     cookie::format_set_cookie("abc123", "/", expires),
///     "SessionId=abc123; path=/; expires=Fri, 05-Jan-2024 15:04:05 GMT;"
/// );
/// ```
pub fn format_set_cookie(id: &str, path: &str, expires_at: DateTime<Utc>) -> String {
    format!(
        "{}={}; path={}; expires={};",
        SESSION_COOKIE_NAME,
        id,
        path,
        expires_at.format(EXPIRES_FORMAT)
    )
}

/// Render the `Set-Cookie` value that clears the session cookie.
pub fn format_clear_cookie(path: &str) -> String {
    format!("{}=; path={};", SESSION_COOKIE_NAME, path)
}

fn parse_expires(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, EXPIRES_FORMAT) {
        return Some(naive.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, EXPIRES_OFFSET_FORMAT) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_rfc2822(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
