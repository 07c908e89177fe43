//! Fine-grained reactive primitives.
//!
//! This module provides the building blocks the stores sit on:
//! - Signals: Reactive state containers, with read-only halves
//! - Memos: Cached computed values
//! - Effects: Side effects that react to changes

mod effect;
mod memo;
mod signal;

pub use effect::{create_effect, Effect};
pub use memo::{computed, create_memo, Memo};
pub use signal::{create_signal, ReadSignal, Signal};
