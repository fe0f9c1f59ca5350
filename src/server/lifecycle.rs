// src/server/lifecycle.rs

//! The listener state machine: `Idle → Listening → Stopping → Stopped`.

use std::fmt;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Sockets are bound but nothing is being accepted yet.
    Idle,
    /// The accept loop is running.
    Listening,
    /// `stop` was called; groups are being closed.
    Stopping,
    /// Every socket is closed and no task touches server state anymore.
    Stopped,
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListenerState::Idle => "idle",
            ListenerState::Listening => "listening",
            ListenerState::Stopping => "stopping",
            ListenerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Publishes the current `ListenerState` so `stop` can wait for `Stopped`.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    tx: watch::Sender<ListenerState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (tx, _) = watch::channel(ListenerState::Idle);
        Self { tx }
    }

    pub(crate) fn get(&self) -> ListenerState {
        *self.tx.borrow()
    }

    pub(crate) fn set(&self, next: ListenerState) {
        let prev = self.tx.send_replace(next);
        if prev != next {
            tracing::debug!("Listener state {} -> {}", prev, next);
        }
    }

    /// Resolves once the listener reaches `Stopped`.
    pub(crate) async fn stopped(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|s| *s == ListenerState::Stopped).await;
    }
}

/// Moves the lifecycle to `Stopped` when `Server::run` returns or is dropped.
pub(crate) struct RunGuard<'a>(pub(crate) &'a Lifecycle);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.set(ListenerState::Stopped);
    }
}
