//! Connectivity and authentication state.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

/// Observed connectivity and authentication state.
///
/// The engine reads these signals reactively but does not own them; the
/// host application forwards its network and auth observers here. This is
/// an explicit, constructed object with a defined lifecycle (create at app
/// start, reset at sign-out) rather than a process-wide singleton, so tests
/// never leak state into each other.
#[derive(Debug)]
pub struct SessionState {
    online: AtomicBool,
    user: RwLock<Option<String>>,
    sync_enabled: AtomicBool,
}

impl SessionState {
    /// Creates a session that is online, signed out, with sync enabled.
    pub fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
            user: RwLock::new(None),
            sync_enabled: AtomicBool::new(true),
        }
    }

    /// Updates the connectivity signal.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Whether the device currently reports connectivity.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Records an authenticated identity.
    pub fn sign_in(&self, user_id: impl Into<String>) {
        *self.user.write() = Some(user_id.into());
    }

    /// Clears the authenticated identity.
    pub fn sign_out(&self) {
        *self.user.write() = None;
    }

    /// The authenticated user id, if any.
    pub fn user_id(&self) -> Option<String> {
        self.user.read().clone()
    }

    /// Whether remote sync is enabled at all.
    pub fn sync_enabled(&self) -> bool {
        self.sync_enabled.load(Ordering::SeqCst)
    }

    /// Enables or disables remote sync.
    pub fn set_sync_enabled(&self, enabled: bool) {
        self.sync_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
