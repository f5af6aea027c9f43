//! Cluster Topology & Health Module
//!
//! Owns the node's view of the cluster: who it is, who its peers are, and
//! which of those peers are currently reachable.
//!
//! ## Core Mechanisms
//! - **Static topology**: the peer set is pure configuration (base URLs read
//!   at process start), never an object graph. Every component that talks to
//!   the cluster reads the same list.
//! - **Inline health probes**: peers are probed on demand (`GET /health`,
//!   5 s timeout) when a decision needs the health view. A 60 s positive
//!   cache tolerates transient flaps, which obviates a background health
//!   daemon.
//! - **Placement**: new uploads land on the least-loaded healthy node for
//!   the uploading user, counting self via the local chunk store and peers
//!   via their inventory endpoint.

pub mod health;
pub mod placement;
pub mod topology;

#[cfg(test)]
mod tests;
