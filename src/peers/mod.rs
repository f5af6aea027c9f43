//! Peer Communication Module
//!
//! Typed HTTP client for the inter-node surface, plus the shared wire
//! protocol (endpoint paths and DTOs) used by both the client and the
//! handlers that serve the same endpoints.
//!
//! Every operation carries its own timeout (3 s existence probes, 5 s
//! probes/inventories/deletes, 30 s transfers); timeouts are the only
//! cancellation mechanism in the system. Path components are URL-escaped
//! individually, and non-2xx responses surface as errors carrying a body
//! prefix for diagnostics.

pub mod client;
pub mod protocol;
