// src/connection/group.rs

//! Defines `ConnectionGroup`, the bundle of every live socket from one source
//! address together with the lock that serializes reads across them.
//!
//! High-throughput clients of this protocol open many parallel sockets from a
//! single address. Treating them as one unit bounds the number of concurrent
//! readers by the number of distinct addresses instead of the number of sockets.
//!
//! The group's read loop holds `members` for one full round-robin pass. Newly
//! accepted sockets never wait on that lock: the accept loop pushes them onto
//! `pending`, and the read loop admits them at the start of the next pass.

use super::guard::GroupGuard;
use crate::core::metrics;
use crate::core::protocol::PxLineCodec;
use crate::core::state::ServerState;
use futures::{FutureExt, StreamExt};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One admitted socket and its line scanner.
#[derive(Debug)]
struct Member {
    addr: SocketAddr,
    framed: FramedRead<TcpStream, PxLineCodec>,
}

/// What a single round-robin pass ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassOutcome {
    Continue,
    Shutdown,
}

#[derive(Debug)]
pub struct ConnectionGroup {
    ip: IpAddr,
    max_line_length: usize,
    /// Admitted sockets keyed by source port. This mutex is the group lock.
    members: Mutex<HashMap<u16, Member>>,
    /// Sockets accepted but not yet admitted by the read loop.
    pending: parking_lot::Mutex<Vec<(SocketAddr, TcpStream)>>,
    /// Number of admitted sockets, readable without the group lock.
    admitted: AtomicUsize,
}

impl ConnectionGroup {
    pub(crate) fn new(ip: IpAddr, max_line_length: usize) -> Self {
        Self {
            ip,
            max_line_length,
            members: Mutex::new(HashMap::new()),
            pending: parking_lot::Mutex::new(Vec::new()),
            admitted: AtomicUsize::new(0),
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    /// Sockets owned by this group, admitted or still queued.
    pub fn socket_count(&self) -> usize {
        self.admitted.load(Ordering::Acquire) + self.pending.lock().len()
    }

    /// True when the group owns no sockets at all and may be removed.
    pub fn is_idle(&self) -> bool {
        self.pending.lock().is_empty() && self.admitted.load(Ordering::Acquire) == 0
    }

    /// Queues a freshly accepted socket for admission.
    pub(crate) fn enqueue(&self, addr: SocketAddr, stream: TcpStream) {
        metrics::CONNECTED_CLIENTS.inc();
        self.pending.lock().push((addr, stream));
    }

    /// Moves queued sockets into the member set. Must be called with the group lock held.
    fn admit_pending(&self, members: &mut HashMap<u16, Member>) {
        let mut pending = self.pending.lock();
        for (addr, stream) in pending.drain(..) {
            debug!("Admitting connection {} into group {}", addr, self.ip);
            let member = Member {
                addr,
                framed: FramedRead::new(stream, PxLineCodec::new(self.max_line_length)),
            };
            if let Some(replaced) = members.insert(addr.port(), member) {
                debug!("Replacing stale connection {} in group {}", replaced.addr, self.ip);
                metrics::CONNECTED_CLIENTS.dec();
            }
        }
        self.admitted.store(members.len(), Ordering::Release);
    }

    /// The read loop. Runs until the server shuts down or the group becomes
    /// empty and is removed from the registry.
    pub async fn run(self: Arc<Self>, state: Arc<ServerState>, shutdown: CancellationToken) {
        let mut guard = GroupGuard::new(state.clone(), self.clone());
        info!("Connection group for {} started.", self.ip);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            let mut members = self.members.lock().await;
            self.admit_pending(&mut members);

            if members.is_empty() {
                drop(members);
                // Fails if a socket was queued since the lock was released;
                // the next pass will admit it.
                if state.groups.remove_if_idle(&self) {
                    guard.mark_removed();
                    debug!("Connection group for {} is empty, removed.", self.ip);
                    break;
                }
                if self.pending.lock().is_empty() {
                    // No longer the registered group for this address.
                    break;
                }
                continue;
            }

            let outcome = self.poll_pass(&mut members, &state, &shutdown).await;
            drop(members);

            if outcome == PassOutcome::Shutdown {
                break;
            }
            // Give the accept loop and other groups a turn between passes.
            tokio::task::yield_now().await;
        }

        self.close_all().await;
        info!("Connection group for {} stopped.", self.ip);
    }

    /// Visits every member once. Each socket gets up to one read deadline to
    /// produce its first line, then drains whatever is already available up to
    /// the per-pass budget.
    async fn poll_pass(
        &self,
        members: &mut HashMap<u16, Member>,
        state: &ServerState,
        shutdown: &CancellationToken,
    ) -> PassOutcome {
        let read_timeout = state.config.read_timeout();
        let budget = state.config.max_lines_per_pass;
        let mut closed: Vec<u16> = Vec::new();

        for (port, member) in members.iter_mut() {
            let first = tokio::select! {
                biased;
                _ = shutdown.cancelled() => return PassOutcome::Shutdown,
                res = tokio::time::timeout(read_timeout, member.framed.next()) => res,
            };
            // An idle socket keeps its place; the pass moves on.
            let Ok(mut next) = first else {
                continue;
            };

            let mut taken = 0;
            loop {
                match next {
                    Some(Ok(decoded)) => state.apply_decoded(decoded),
                    Some(Err(e)) => {
                        if e.is_normal_disconnect() {
                            debug!("Connection from {} closed by peer: {}", member.addr, e);
                        } else {
                            warn!("Connection error for {}: {}", member.addr, e);
                        }
                        closed.push(*port);
                        break;
                    }
                    None => {
                        debug!("Connection from {} closed by peer.", member.addr);
                        closed.push(*port);
                        break;
                    }
                }
                taken += 1;
                if taken >= budget {
                    break;
                }
                match member.framed.next().now_or_never() {
                    Some(item) => next = item,
                    None => break,
                }
            }
        }

        for port in closed {
            if members.remove(&port).is_some() {
                metrics::CONNECTED_CLIENTS.dec();
            }
        }
        self.admitted.store(members.len(), Ordering::Release);
        PassOutcome::Continue
    }

    /// Takes the group lock and closes every socket, admitted or queued.
    /// Returns the number of sockets closed.
    pub async fn close_all(&self) -> usize {
        let mut members = self.members.lock().await;
        let mut closed = members.len();
        members.clear();
        closed += {
            let mut pending = self.pending.lock();
            let n = pending.len();
            pending.clear();
            n
        };
        self.admitted.store(0, Ordering::Release);
        drop(members);

        if closed > 0 {
            metrics::CONNECTED_CLIENTS.sub(closed as f64);
            debug!("Closed {} sockets in group {}", closed, self.ip);
        }
        closed
    }
}
