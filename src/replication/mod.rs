//! Replication & Anti-Entropy Module
//!
//! Keeps every known file on exactly the configured number of nodes.
//!
//! ## Core Mechanisms
//! - **Synchronous fan-out** (`Replicator`): after a successful local write,
//!   push the payload to healthy peers until the replication factor is
//!   reached or peers are exhausted. HEAD-before-push makes the fan-out
//!   idempotent; under-replication is logged, never a request failure.
//! - **Anti-entropy** (`Reconciler`): a background pass gathers every node's
//!   inventory, diffs replica counts against the replication factor, and
//!   repairs in parallel under a bounded semaphore. Under-replication is
//!   fixed by pull-then-push from the first scanned holder; over-replication
//!   is pruned deterministically (lexicographic node order), so repeated
//!   passes converge instead of oscillating.
//!
//! The two mechanisms race benignly: both HEAD-check before transferring,
//! so the steady state is correct without cross-node locks.

pub mod reconciler;
pub mod replicator;

#[cfg(test)]
mod tests;
