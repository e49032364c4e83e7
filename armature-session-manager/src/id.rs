//! Session id generation.

use crate::error::{SessionError, SessionResult};
use rand::RngCore;
use rand::rngs::OsRng;
use std::fmt;

/// Number of random bytes in a session id (128 bits).
pub const SESSION_ID_BYTES: usize = 16;

/// Length of a rendered session id in hex characters.
pub const SESSION_ID_LEN: usize = SESSION_ID_BYTES * 2;

/// Source of random bytes for session ids.
///
/// Implementations must be cryptographically secure. A failure is reported,
/// never papered over with a weaker source.
pub trait EntropySource: Send + Sync {
    /// Fill `dest` completely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<(), String>;
}

/// Entropy from the operating system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn fill(&self, dest: &mut [u8]) -> Result<(), String> {
        let mut rng = OsRng;
        rng.try_fill_bytes(dest).map_err(|e| e.to_string())
    }
}

/// Mints unguessable, fixed-width session ids.
pub struct IdGenerator {
    source: Box<dyn EntropySource>,
}

impl IdGenerator {
    /// Create a generator backed by the OS random source.
    pub fn new() -> Self {
        Self::with_source(OsEntropy)
    }

    /// Create a generator backed by a custom entropy source.
    pub fn with_source(source: impl EntropySource + 'static) -> Self {
        Self {
            source: Box::new(source),
        }
    }

    /// Generate a new session id.
    ///
    /// Returns [`SessionError::EntropyUnavailable`] if the source fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use armature_session_manager::IdGenerator;
    ///
    /// let id = IdGenerator::new().generate().unwrap();
    /// assert_eq!(id.len(), 32);
    /// ```
    pub fn generate(&self) -> SessionResult<String> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        self.source
            .fill(&mut bytes)
            .map_err(SessionError::EntropyUnavailable)?;
        Ok(hex::encode(bytes))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}
