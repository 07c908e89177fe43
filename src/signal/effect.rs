use crate::runtime::ReactiveRuntime;
use std::sync::Arc;

/// A side effect that runs when its dependencies change.
///
/// Effects track every signal or memo read while they run and re-run (and
/// re-track) after any of them changed. Writes made inside one batch, such
/// as a single store mutation, re-run an effect once. The effect stops when
/// this handle is dropped.
///
/// # Examples
///
/// ```
/// use larder::{Effect, Signal};
/// use std::sync::{Arc, atomic::{AtomicI32, Ordering}};
///
/// let signal = Signal::new(5);
/// let last_value = Arc::new(AtomicI32::new(0));
///
/// let _effect = Effect::new({
///     let signal = signal.clone();
///     let last_value = last_value.clone();
///     move || last_value.store(signal.get(), Ordering::SeqCst)
/// });
/// assert_eq!(last_value.load(Ordering::SeqCst), 5);
///
/// signal.set(10);
/// assert_eq!(last_value.load(Ordering::SeqCst), 10);
/// ```
pub struct Effect {
    id: usize,
    runtime: Arc<ReactiveRuntime>,
}

impl Effect {
    /// Create a new effect and run it immediately to establish its
    /// dependencies.
    pub fn new<F>(effect: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        runtime.create_observer(id, Arc::new(effect));
        runtime.run_observer(id);

        Self { id, runtime }
    }

    /// Manually trigger the effect.
    pub fn run(&self) {
        self.runtime.run_observer(self.id);
    }
}

impl Drop for Effect {
    fn drop(&mut self) {
        self.runtime.remove_observer(self.id);
    }
}

/// Create a new effect that runs when dependencies change.
///
/// The returned handle keeps the effect alive.
pub fn create_effect<F>(effect: F) -> Effect
where
    F: Fn() + Send + Sync + 'static,
{
    Effect::new(effect)
}
