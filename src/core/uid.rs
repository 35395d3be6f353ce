//! Unique identifier provisioning.
//!
//! Identifiers are opaque strings to the object model. [`UidGenerator`] is a
//! simple default; callers with an organisational root plug in their own
//! [`UidProvider`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::util::{Error, Result};

/// Process-wide counter shared by every [`UidGenerator`].
static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Source of fresh unique identifiers.
pub trait UidProvider {
    /// Return a new identifier, never returned before by this provider.
    fn next_uid(&mut self) -> Result<String>;
}

/// Root-prefixed generator: `<root>.<seconds>.<pid>.<counter>`.
///
/// The counter is shared across all generators in the process, so two
/// generators created in the same second never hand out the same identifier.
#[derive(Clone, Debug)]
pub struct UidGenerator {
    root: String,
    stamp: u64,
    pid: u32,
}

impl UidGenerator {
    /// Default root used when none is supplied (UUID-derived arc).
    pub const DEFAULT_ROOT: &'static str = "2.25";

    /// Identifiers are limited to 64 characters.
    pub const MAX_LEN: usize = 64;

    pub fn new(root: impl Into<String>) -> Self {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            root: root.into().trim_end_matches('.').to_string(),
            stamp,
            pid: std::process::id(),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }
}

impl Default for UidGenerator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_ROOT)
    }
}

impl UidProvider for UidGenerator {
    fn next_uid(&mut self) -> Result<String> {
        let counter = NEXT_UID.fetch_add(1, Ordering::Relaxed);
        let uid = format!("{}.{}.{}.{}", self.root, self.stamp, self.pid, counter);
        if uid.len() > Self::MAX_LEN {
            return Err(Error::UidTooLong(uid));
        }
        Ok(uid)
    }
}

impl<F: FnMut() -> String> UidProvider for F {
    fn next_uid(&mut self) -> Result<String> {
        Ok(self())
    }
}
