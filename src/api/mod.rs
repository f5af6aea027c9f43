//! HTTP API Module
//!
//! The web surface of a node, split the way the traffic is split:
//!
//! - **`handlers`**: public, bearer-authenticated endpoints (upload,
//!   download, delete, per-user listing). Upload is the entry point of the
//!   placement + replication pipeline; download walks authoritative node,
//!   then healthy replicas.
//! - **`internal`**: the unauthenticated peer-to-peer surface (`/health`,
//!   `/files`, `/files/raw/...`, `/store-local`) consumed by `PeerClient`
//!   on other nodes.
//! - **`admin`**: operational read-outs (cluster status, global file view,
//!   counts) and the manual sync trigger.
//! - **`error`**: the error-to-status mapping for the request path.
//! - **`protocol`**: response DTOs for the public and admin endpoints.

pub mod admin;
pub mod error;
pub mod handlers;
pub mod internal;
pub mod protocol;
