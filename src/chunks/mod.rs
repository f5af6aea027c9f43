//! Local Chunk Storage Module
//!
//! Implements the on-disk layout that makes files reconstructible:
//! `${STORAGE_ROOT}/${NODE_ID}/${user_id}/${filename}/{i}.chunk`.
//!
//! ## Core Concepts
//! - **Chunking**: Payloads are split into fixed-size windows (1 MiB by default);
//!   the last chunk carries the remainder. Chunk indices form a gap-free prefix,
//!   so a reader that stops at the first missing index never serves a torn file.
//! - **Ownership**: Each node writes exclusively under its own node-id subtree.
//!   Remote nodes reach this data only through the peer HTTP surface.
//! - **Path safety**: Supplied filenames (and user ids) are reduced to their final
//!   path component before touching the filesystem.
//!
//! The store is a pure filesystem adapter. It never consults the network.

pub mod store;
