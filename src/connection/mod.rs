// src/connection/mod.rs

//! Per-source-address connection grouping: the registry that maps addresses to
//! groups, the groups themselves, and the read loop that turns bytes into grid
//! writes.

mod group;
mod guard;
mod registry;

pub use group::ConnectionGroup;
pub use guard::GroupGuard;
pub use registry::{GroupRegistry, Joined};
