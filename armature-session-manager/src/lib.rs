//! In-memory session management for Armature applications.
//!
//! A [`SessionStore`] ties an opaque `SessionId` cookie to server-side state
//! of any type `T`, slides each session's expiry forward on every access,
//! and evicts sessions left idle past the timeout from a background task.
//!
//! # ⚠️ Single Process Only
//!
//! Sessions live in this process's memory. They do not survive a restart
//! and are not shared between instances. For horizontally scaled services
//! prefer stateless JWT authentication.
//!
//! # Request Flow
//!
//! 1. Read the request's `Cookie` header.
//! 2. [`SessionStore::resolve`] finds the session it names, or creates one.
//! 3. Send [`SessionStore::set_cookie_header`] back as `Set-Cookie`.
//!
//! The outbound header looks like:
//!
//! ```text
//! SessionId=3f2a...; path=/; expires=Fri, 05-Jan-2024 15:04:05 GMT;
//! ```
//!
//! # Lifecycle Hooks
//!
//! `on_start` fires when a session is created; `on_end` fires when an
//! expired session is evicted. [`SessionStore::remove`] and
//! [`SessionStore::abandon`] end a session without calling `on_end`.
//! Hooks run while the store is locked and must not call back into it.
//!
//! # Examples
//!
//! ```
//! use armature_session_manager::*;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), SessionError> {
//!     let store: SessionStore<String> = SessionStore::builder()
//!         .timeout(Duration::from_secs(10))
//!         .on_start(|session| println!("started new session {}", session.id()))
//!         .on_end(|session| println!("session {} expired", session.id()))
//!         .build()?;
//!
//!     // Login request without a cookie
//!     let session = store.resolve(None)?;
//!     session.set_value("alice".to_string());
//!     let set_cookie = store.set_cookie_header(&session);
//!
//!     // Logout request carrying the cookie
//!     let session = store.resolve(Some(&set_cookie))?;
//!     assert_eq!(session.value().as_deref(), Some("alice"));
//!     let clear_cookie = store.abandon(session.id());
//!     assert_eq!(clear_cookie, "SessionId=; path=/;");
//!
//!     store.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod cookie;
pub mod error;
pub mod hooks;
pub mod id;
pub mod record;
pub mod store;

mod reaper;

pub use config::SessionConfig;
pub use cookie::{CookieHeader, SESSION_COOKIE_NAME};
pub use error::{SessionError, SessionResult};
pub use hooks::SessionHook;
pub use id::{EntropySource, IdGenerator, OsEntropy};
pub use record::SessionRecord;
pub use store::{SessionStore, SessionStoreBuilder};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::cookie::{self, CookieHeader, SESSION_COOKIE_NAME};
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::id::{EntropySource, IdGenerator};
    pub use crate::record::SessionRecord;
    pub use crate::store::{SessionStore, SessionStoreBuilder};
}
