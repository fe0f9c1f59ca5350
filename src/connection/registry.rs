// src/connection/registry.rs

//! The address → group map.
//!
//! A `DashMap` entry lock is the registration lock: looking up or creating a
//! group and enqueueing its socket happen while the entry's shard is held, and
//! so does the idle check that removes a group. No network I/O ever happens
//! under it.

use super::group::ConnectionGroup;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpStream;

/// The outcome of routing an accepted socket.
#[derive(Debug)]
pub enum Joined {
    /// The address was new; the caller must spawn the group's read loop.
    New(Arc<ConnectionGroup>),
    /// The socket was queued on a group whose read loop is already running.
    Existing(Arc<ConnectionGroup>),
}

#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: DashMap<IpAddr, Arc<ConnectionGroup>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes `stream` to the group for its source IP, creating the group if
    /// this is the first live connection from that address.
    pub fn join(&self, stream: TcpStream, addr: SocketAddr, max_line_length: usize) -> Joined {
        match self.groups.entry(addr.ip()) {
            Entry::Occupied(entry) => {
                let group = entry.get().clone();
                group.enqueue(addr, stream);
                Joined::Existing(group)
            }
            Entry::Vacant(entry) => {
                let group = Arc::new(ConnectionGroup::new(addr.ip(), max_line_length));
                group.enqueue(addr, stream);
                entry.insert(group.clone());
                Joined::New(group)
            }
        }
    }

    /// Removes `group` if it is still the registered group for its address and
    /// holds no sockets, live or queued.
    pub fn remove_if_idle(&self, group: &Arc<ConnectionGroup>) -> bool {
        self.groups
            .remove_if(&group.ip(), |_, registered| {
                Arc::ptr_eq(registered, group) && registered.is_idle()
            })
            .is_some()
    }

    /// Removes `group` if it is still the registered group for its address.
    pub fn remove(&self, group: &Arc<ConnectionGroup>) -> bool {
        self.groups
            .remove_if(&group.ip(), |_, registered| Arc::ptr_eq(registered, group))
            .is_some()
    }

    pub fn get(&self, ip: &IpAddr) -> Option<Arc<ConnectionGroup>> {
        self.groups.get(ip).map(|entry| entry.value().clone())
    }

    /// A copy of the current groups. Callers may await on the returned groups
    /// without holding any shard lock.
    pub fn snapshot(&self) -> Vec<Arc<ConnectionGroup>> {
        self.groups.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
