use crate::runtime::{recover, ReactiveRuntime};
use std::fmt;
use std::sync::{Arc, RwLock};

struct MemoInner<T> {
    id: usize,
    compute: Box<dyn Fn() -> T + Send + Sync>,
    cached: RwLock<Option<Arc<T>>>,
    runtime: Arc<ReactiveRuntime>,
}

impl<T> Drop for MemoInner<T> {
    fn drop(&mut self) {
        self.runtime.remove_observer(self.id);
        self.runtime.remove_source(self.id);
    }
}

/// A memoized computed value that automatically tracks dependencies.
///
/// The computation runs lazily on first read and again only after a signal
/// or memo it read during its last run has changed. Between recomputations
/// every read hands out the same shared value.
pub struct Memo<T> {
    inner: Arc<MemoInner<T>>,
}

impl<T> Memo<T> {
    /// Create a new memo with the given computation function.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        // Register this as a memo with the runtime
        runtime.register_memo(id);

        Self {
            inner: Arc::new(MemoInner {
                id,
                compute: Box::new(compute),
                cached: RwLock::new(None),
                runtime,
            }),
        }
    }

    /// Get the current value as a shared pointer, recomputing if necessary.
    ///
    /// Two calls with no dependency change in between return pointers to
    /// the same allocation.
    pub fn get_shared(&self) -> Arc<T> {
        let inner = &self.inner;
        let runtime = &inner.runtime;

        // Track this read in the reactive context
        runtime.track_read(inner.id);

        if !runtime.is_memo_dirty(inner.id) {
            if let Some(value) = recover(inner.cached.read()).as_ref() {
                return Arc::clone(value);
            }
        }

        // Recompute within observer context to collect fresh dependencies
        runtime.clear_dependencies(inner.id);
        let value = Arc::new(runtime.with_observer(Some(inner.id), || (inner.compute)()));
        *recover(inner.cached.write()) = Some(Arc::clone(&value));
        runtime.mark_memo_clean(inner.id);
        value
    }

    /// Read the memoized value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let value = self.get_shared();
        f(&*value)
    }

    /// Get the memo's unique ID.
    pub fn id(&self) -> usize {
        self.inner.id
    }
}

impl<T: Clone> Memo<T> {
    /// Get the current value, recomputing if necessary.
    pub fn get(&self) -> T {
        T::clone(&*self.get_shared())
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Memo").field("id", &self.inner.id).finish()
    }
}

/// Create a new memoized computation.
///
/// # Example
///
/// ```
/// use larder::{create_memo, create_signal};
///
/// let (count, set_count) = create_signal(5);
/// let doubled = create_memo(move || count.get() * 2);
/// assert_eq!(doubled.get(), 10);
///
/// set_count.set(6);
/// assert_eq!(doubled.get(), 12);
/// ```
pub fn create_memo<T, F>(compute: F) -> Memo<T>
where
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}

/// Alias of [`create_memo`] under the name derived-value cells usually carry.
pub fn computed<T, F>(compute: F) -> Memo<T>
where
    F: Fn() -> T + Send + Sync + 'static,
{
    Memo::new(compute)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::create_signal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn memo_basic() {
        ReactiveRuntime::scope(|| {
            let (count, set_count) = create_signal(5);
            let doubled = create_memo(move || count.get() * 2);

            assert_eq!(doubled.get(), 10);

            set_count.set(10);
            assert_eq!(doubled.get(), 20);
        });
    }

    #[test]
    fn memo_is_lazy_and_cached() {
        ReactiveRuntime::scope(|| {
            let runs = Arc::new(AtomicUsize::new(0));
            let (count, set_count) = create_signal(1);
            let doubled = create_memo({
                let runs = runs.clone();
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    count.get() * 2
                }
            });
            assert_eq!(runs.load(Ordering::SeqCst), 0);

            let first = doubled.get_shared();
            let second = doubled.get_shared();
            assert!(Arc::ptr_eq(&first, &second));
            assert_eq!(runs.load(Ordering::SeqCst), 1);

            set_count.set(2);
            let third = doubled.get_shared();
            assert!(!Arc::ptr_eq(&first, &third));
            assert_eq!(*third, 4);
            assert_eq!(runs.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn memo_drops_stale_dependencies() {
        ReactiveRuntime::scope(|| {
            let runs = Arc::new(AtomicUsize::new(0));
            let (use_left, set_use_left) = create_signal(true);
            let (left, set_left) = create_signal(1);
            let (right, _set_right) = create_signal(2);
            let picked = create_memo({
                let runs = runs.clone();
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    if use_left.get() {
                        left.get()
                    } else {
                        right.get()
                    }
                }
            });

            assert_eq!(picked.get(), 1);
            set_use_left.set(false);
            assert_eq!(picked.get(), 2);

            // `left` is no longer read, so writing it must not recompute
            set_left.set(100);
            assert_eq!(picked.get(), 2);
            assert_eq!(runs.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn panicking_memo_recovers_on_next_read() {
        ReactiveRuntime::scope(|| {
            let (divisor, set_divisor) = create_signal(0);
            let quotient = create_memo(move || {
                let d = divisor.get();
                if d == 0 {
                    panic!("division by zero");
                }
                100 / d
            });

            let first = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| quotient.get()));
            assert!(first.is_err());

            set_divisor.set(4);
            assert_eq!(quotient.get(), 25);
        });
    }
}
