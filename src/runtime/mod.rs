//! Runtime support for reactive primitives.
//!
//! This module provides the infrastructure for dependency tracking,
//! batched notification, and execution contexts.

mod context;

pub use context::ReactiveRuntime;

use std::sync::{LockResult, PoisonError};

/// Recover the guard from a poisoned lock.
///
/// User code (mutators, getters, effects) never runs while one of the
/// crate's locks is held, so a poisoned lock still guards consistent data.
pub(crate) fn recover<G>(result: LockResult<G>) -> G {
    result.unwrap_or_else(PoisonError::into_inner)
}
