//! Session lifecycle callbacks.
//!
//! Hooks run synchronously while the store lock is held. A hook must not
//! block and must not call back into the store that invoked it: the lock is
//! not reentrant and such a call deadlocks.
//!
//! A panicking hook is caught and logged; it never takes down the reaper or
//! the request that triggered it.

use crate::record::SessionRecord;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// Callback invoked with the affected session.
pub type SessionHook<T> = Arc<dyn Fn(&SessionRecord<T>) + Send + Sync>;

/// Optional `on_start` / `on_end` callbacks.
///
/// `on_start` fires once when a session is created. `on_end` fires once when
/// an expired session is evicted; explicit removal is silent.
pub struct LifecycleHooks<T> {
    on_start: Option<SessionHook<T>>,
    on_end: Option<SessionHook<T>>,
}

impl<T> LifecycleHooks<T> {
    /// No callbacks registered.
    pub fn new() -> Self {
        Self {
            on_start: None,
            on_end: None,
        }
    }

    pub(crate) fn set_on_start(&mut self, hook: SessionHook<T>) {
        self.on_start = Some(hook);
    }

    pub(crate) fn set_on_end(&mut self, hook: SessionHook<T>) {
        self.on_end = Some(hook);
    }

    pub(crate) fn started(&self, record: &SessionRecord<T>) {
        if let Some(hook) = &self.on_start {
            dispatch("on_start", hook, record);
        }
    }

    pub(crate) fn ended(&self, record: &SessionRecord<T>) {
        if let Some(hook) = &self.on_end {
            dispatch("on_end", hook, record);
        }
    }
}

fn dispatch<T>(name: &'static str, hook: &SessionHook<T>, record: &SessionRecord<T>) {
    if panic::catch_unwind(AssertUnwindSafe(|| hook(record))).is_err() {
        warn!(hook = name, session_id = %record.id(), "Session hook panicked");
    }
}

impl<T> Default for LifecycleHooks<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for LifecycleHooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHooks")
            .field("on_start", &self.on_start.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_dispatch() {
        let starts = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));

        let mut hooks: LifecycleHooks<()> = LifecycleHooks::new();
        let s = starts.clone();
        hooks.set_on_start(Arc::new(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        }));
        let e = ends.clone();
        hooks.set_on_end(Arc::new(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        }));

        let record = SessionRecord::new("id".to_string(), Utc::now(), chrono::Duration::seconds(1));
        hooks.started(&record);
        hooks.ended(&record);
        hooks.ended(&record);

        assert_eq!(starts.load(Ordering::SeqCst), 1);
        assert_eq!(ends.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_panicking_hook_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let mut hooks: LifecycleHooks<()> = LifecycleHooks::new();
        hooks.set_on_end(Arc::new(move |_| {
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("hook failure");
            }
        }));

        let record = SessionRecord::new("id".to_string(), Utc::now(), chrono::Duration::seconds(1));
        hooks.ended(&record);
        hooks.ended(&record);

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unset_hooks_are_noops() {
        let hooks: LifecycleHooks<()> = LifecycleHooks::default();
        let record = SessionRecord::new("id".to_string(), Utc::now(), chrono::Duration::seconds(1));
        hooks.started(&record);
        hooks.ended(&record);
        assert_eq!(format!("{:?}", hooks), "LifecycleHooks { on_start: false, on_end: false }");
    }
}
