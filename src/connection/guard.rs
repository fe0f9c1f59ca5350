// src/connection/guard.rs

//! Defines `GroupGuard`, an RAII guard for connection group bookkeeping.

use super::group::ConnectionGroup;
use crate::core::state::ServerState;
use std::sync::Arc;
use tracing::debug;

/// Ensures a group is unregistered when its read loop exits for any reason,
/// including a panic inside the loop.
pub struct GroupGuard {
    state: Arc<ServerState>,
    group: Arc<ConnectionGroup>,
    /// Set when the loop already removed the group through the idle check.
    removed: bool,
}

impl GroupGuard {
    pub(crate) fn new(state: Arc<ServerState>, group: Arc<ConnectionGroup>) -> Self {
        Self {
            state,
            group,
            removed: false,
        }
    }

    /// Marks the group as already removed from the registry.
    pub(crate) fn mark_removed(&mut self) {
        self.removed = true;
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        if self.state.groups.remove(&self.group) {
            debug!(
                "GroupGuard dropping, unregistered group for {}",
                self.group.ip()
            );
        }
    }
}
