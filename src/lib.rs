//! Distributed File Store Cluster Library
//!
//! This library crate defines the core modules of a small-cluster
//! distributed file store: a fixed set of peer nodes that accept user
//! uploads over HTTP, chunk each file onto local disk, replicate it to a
//! target number of peers, and periodically reconcile replica counts.
//!
//! ## Architecture Modules
//! The system is composed of loosely coupled subsystems:
//!
//! - **`chunks`**: The on-disk layer. Splits payloads into fixed-size
//!   chunks under a per-node / per-user / per-file directory and
//!   reconstructs them in index order.
//! - **`cluster`**: Node identity, the static peer topology, on-demand
//!   health probing with a positive-cache grace window, and least-loaded
//!   upload placement.
//! - **`peers`**: The typed HTTP client for the inter-node endpoints and
//!   the shared wire protocol both sides speak.
//! - **`replication`**: The synchronous upload fan-out and the background
//!   anti-entropy reconciler that repairs under- and over-replication.
//! - **`metadata`**: Port over the external directory that remembers which
//!   nodes hold which files.
//! - **`auth`**: Port over the external identity provider, plus the bearer
//!   extractor for the public API.
//! - **`api`**: The HTTP surface: public authenticated endpoints, the
//!   internal peer-to-peer surface, and operational read-outs.

pub mod api;
pub mod auth;
pub mod chunks;
pub mod cluster;
pub mod metadata;
pub mod peers;
pub mod replication;
