//! In-memory session store with sliding expiration.

use crate::config::SessionConfig;
use crate::cookie;
use crate::error::SessionResult;
use crate::hooks::LifecycleHooks;
use crate::id::IdGenerator;
use crate::reaper;
use crate::record::SessionRecord;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// State shared between the store handle and its reaper task.
pub(crate) struct StoreState<T> {
    records: Mutex<HashMap<String, Arc<SessionRecord<T>>>>,
    ttl: chrono::Duration,
    hooks: LifecycleHooks<T>,
    ids: IdGenerator,
}

impl<T> StoreState<T> {
    /// Evict every session that expired before `now`, firing `on_end` for each.
    pub(crate) fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut records = self.records.lock();
        let mut expired = Vec::new();

        records.retain(|_, record| {
            if record.is_expired_at(now) {
                expired.push(record.clone());
                false
            } else {
                true
            }
        });

        for record in &expired {
            debug!(session_id = %record.id(), "Expired session");
            self.hooks.ended(record);
        }

        expired.len()
    }
}

/// Concurrent session store.
///
/// Sessions are created on first access, their expiry slides forward on
/// every later access, and a background reaper evicts the ones left idle
/// past the configured timeout. Lookup, creation, removal and eviction all
/// go through a single lock, so two requests carrying the same unknown id
/// can never race into two different sessions.
///
/// Dropping the store stops the reaper.
///
/// # Examples
///
/// ```
/// use armature_session_manager::SessionStore;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), armature_session_manager::SessionError> {
/// let store: SessionStore<String> = SessionStore::builder()
///     .timeout(Duration::from_secs(600))
///     .on_start(|session| println!("started {}", session.id()))
///     .build()?;
///
/// // First request: no cookie, a session is created
/// let session = store.resolve(None)?;
/// session.set_value("alice".to_string());
/// let set_cookie = store.set_cookie_header(&session);
///
/// // Next request echoes the cookie back
/// let again = store.resolve(Some(&set_cookie))?;
/// assert_eq!(again.id(), session.id());
/// assert_eq!(again.value().as_deref(), Some("alice"));
/// # Ok(())
/// # }
/// ```
pub struct SessionStore<T> {
    state: Arc<StoreState<T>>,
    config: SessionConfig,
    cancel: CancellationToken,
    reaper: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> SessionStore<T> {
    /// Create a store with the given configuration and no hooks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a store.
    pub fn builder() -> SessionStoreBuilder<T> {
        SessionStoreBuilder::new()
    }

    /// Look up a session, creating one if `candidate` is empty or unknown.
    ///
    /// A known, unexpired id has its expiry slid to `now + timeout`. An id
    /// whose session already expired but has not been swept yet is evicted
    /// on the spot and treated as unknown. New sessions get a freshly minted
    /// id, never `candidate`, and fire `on_start` exactly once.
    ///
    /// Fails only if a new id is needed and the entropy source is
    /// unavailable; nothing is inserted in that case.
    pub fn get_or_create(&self, candidate: &str) -> SessionResult<Arc<SessionRecord<T>>> {
        let now = Utc::now();
        let mut records = self.state.records.lock();

        if !candidate.is_empty() {
            if let Some(record) = records.get(candidate) {
                if !record.is_expired_at(now) {
                    record.touch(now, self.state.ttl);
                    trace!(session_id = %candidate, "Touched session");
                    return Ok(record.clone());
                }
            }

            if let Some(stale) = records.remove(candidate) {
                debug!(session_id = %candidate, "Evicting expired session on access");
                self.state.hooks.ended(&stale);
            }
        }

        let id = loop {
            let id = self.state.ids.generate().inspect_err(|e| {
                warn!(error = %e, "Failed to generate session id");
            })?;
            if !records.contains_key(&id) {
                break id;
            }
        };

        let record = Arc::new(SessionRecord::new(id.clone(), now, self.state.ttl));
        records.insert(id, record.clone());
        debug!(session_id = %record.id(), "Created session");
        self.state.hooks.started(&record);

        Ok(record)
    }

    /// Resolve the session for a request from its raw `Cookie` header.
    pub fn resolve(&self, cookie_header: Option<&str>) -> SessionResult<Arc<SessionRecord<T>>> {
        let candidate = cookie::candidate_id(cookie_header);
        self.get_or_create(&candidate)
    }

    /// Remove a session without firing `on_end`.
    pub fn remove(&self, id: &str) -> Option<Arc<SessionRecord<T>>> {
        let removed = self.state.records.lock().remove(id);
        if removed.is_some() {
            debug!(session_id = %id, "Removed session");
        }
        removed
    }

    /// Remove a session and return the `Set-Cookie` value that clears it
    /// on the client.
    pub fn abandon(&self, id: &str) -> String {
        self.remove(id);
        cookie::format_clear_cookie(&self.config.cookie_path)
    }

    /// Check if a session with this id is held.
    pub fn has(&self, id: &str) -> bool {
        self.state.records.lock().contains_key(id)
    }

    /// Number of sessions held, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.state.records.lock().len()
    }

    /// Whether the store holds no sessions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict expired sessions now instead of waiting for the reaper.
    ///
    /// Returns the number of sessions evicted.
    pub fn sweep_expired(&self) -> usize {
        self.state.sweep(Utc::now())
    }

    /// `Set-Cookie` value carrying this session's id and current expiry.
    pub fn set_cookie_header(&self, record: &SessionRecord<T>) -> String {
        cookie::format_set_cookie(record.id(), &self.config.cookie_path, record.expires_at())
    }

    /// Configured idle timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Configured cookie path.
    pub fn cookie_path(&self) -> &str {
        &self.config.cookie_path
    }

    /// Full configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Stop the reaper and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.reaper.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Session reaper did not exit cleanly");
            }
        }
    }
}

impl<T> Drop for SessionStore<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl<T> fmt::Debug for SessionStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore")
            .field("config", &self.config)
            .field("sessions", &self.state.records.lock().len())
            .field("hooks", &self.state.hooks)
            .finish()
    }
}

/// Builder for [`SessionStore`].
///
/// Hooks can only be registered here, before the store serves requests.
pub struct SessionStoreBuilder<T> {
    config: SessionConfig,
    hooks: LifecycleHooks<T>,
    ids: Option<IdGenerator>,
}

impl<T: Send + Sync + 'static> SessionStoreBuilder<T> {
    /// Builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            hooks: LifecycleHooks::new(),
            ids: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the idle timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the cookie path.
    pub fn cookie_path(mut self, path: &str) -> Self {
        self.config.cookie_path = path.to_string();
        self
    }

    /// Set the reaper period.
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    /// Register the callback fired when a session is created.
    pub fn on_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SessionRecord<T>) + Send + Sync + 'static,
    {
        self.hooks.set_on_start(Arc::new(hook));
        self
    }

    /// Register the callback fired when an expired session is evicted.
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SessionRecord<T>) + Send + Sync + 'static,
    {
        self.hooks.set_on_end(Arc::new(hook));
        self
    }

    /// Use a custom id generator.
    pub fn id_generator(mut self, ids: IdGenerator) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Build the store and start its reaper.
    ///
    /// Fails on invalid configuration or when called outside a tokio
    /// runtime.
    pub fn build(self) -> SessionResult<SessionStore<T>> {
        self.config.validate()?;

        let state = Arc::new(StoreState {
            records: Mutex::new(HashMap::new()),
            ttl: self.config.ttl()?,
            hooks: self.hooks,
            ids: self.ids.unwrap_or_default(),
        });

        let cancel = CancellationToken::new();
        let reaper = reaper::spawn(state.clone(), self.config.sweep_interval, cancel.clone())?;

        info!(
            timeout = ?self.config.timeout,
            cookie_path = %self.config.cookie_path,
            sweep_interval = ?self.config.sweep_interval,
            "Session store started"
        );

        Ok(SessionStore {
            state,
            config: self.config,
            cancel,
            reaper: Some(reaper),
        })
    }
}

impl<T: Send + Sync + 'static> Default for SessionStoreBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
