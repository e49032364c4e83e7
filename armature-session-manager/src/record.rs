//! Per-session state held by the store.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use std::fmt;

/// A live session.
///
/// The store hands out `Arc<SessionRecord<T>>`. The id never changes; the
/// expiry is only rewritten by the store while it holds its lock. The
/// application value is free for request handlers to read and replace.
pub struct SessionRecord<T> {
    id: String,
    value: RwLock<Option<T>>,
    created_at: DateTime<Utc>,
    expires_at: RwLock<DateTime<Utc>>,
}

impl<T> SessionRecord<T> {
    pub(crate) fn new(id: String, now: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            id,
            value: RwLock::new(None),
            created_at: now,
            expires_at: RwLock::new(expiry_from(now, ttl)),
        }
    }

    /// Unique session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the session expires unless accessed again.
    pub fn expires_at(&self) -> DateTime<Utc> {
        *self.expires_at.read()
    }

    /// Whether the session had expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at() < now
    }

    /// Check if the session has expired.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Slide the expiry to `now + ttl`.
    pub(crate) fn touch(&self, now: DateTime<Utc>, ttl: chrono::Duration) {
        *self.expires_at.write() = expiry_from(now, ttl);
    }

    /// Bind an application value, returning the previous one.
    pub fn set_value(&self, value: T) -> Option<T> {
        self.value.write().replace(value)
    }

    /// Remove and return the application value.
    pub fn take_value(&self) -> Option<T> {
        self.value.write().take()
    }

    /// Whether an application value is bound.
    pub fn has_value(&self) -> bool {
        self.value.read().is_some()
    }

    /// Run `f` with a borrow of the application value.
    pub fn with_value<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        f(self.value.read().as_ref())
    }
}

/// Latest expiry the cookie date format can carry (four-digit year).
fn latest_expiry() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn expiry_from(now: DateTime<Utc>, ttl: chrono::Duration) -> DateTime<Utc> {
    let latest = latest_expiry();
    now.checked_add_signed(ttl)
        .map_or(latest, |expiry| expiry.min(latest))
}

impl<T: Clone> SessionRecord<T> {
    /// Clone out the application value.
    pub fn value(&self) -> Option<T> {
        self.value.read().clone()
    }
}

impl<T> fmt::Debug for SessionRecord<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRecord")
            .field("id", &self.id)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at())
            .field("has_value", &self.has_value())
            .finish()
    }
}
