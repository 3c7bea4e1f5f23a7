// src/reconcile/mod.rs

//! Completion reconciliation over a task snapshot.
//!
//! - [`stats`] holds the per-(node, batch) counters.
//! - [`reconciler`] answers the questions the gateway closers and the
//!   progress view ask about those counters.
//!
//! Nothing here is persisted or cached: every caller builds a fresh
//! [`Reconciler`] from the task list it just read.

pub mod reconciler;
pub mod stats;

pub use reconciler::Reconciler;
pub use stats::{BatchKey, BatchStats};
