use super::recover;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

type Observer = Arc<dyn Fn() + Send + Sync>;
pub(crate) type Deferred = Box<dyn FnOnce() + Send>;

/// Dependency graph and scheduling state of one runtime.
struct ReactiveContext {
    current_observer: Option<usize>,
    // Map from source ID (signal or memo) to the observers that read it
    dependencies: HashMap<usize, HashSet<usize>>,
    // Map from observer ID to the sources it read during its last run
    observer_deps: HashMap<usize, HashSet<usize>>,
    // Map from effect ID to the effect function
    observers: HashMap<usize, Observer>,
    // Map from memo ID to dirty state
    memo_dirty: HashMap<usize, bool>,
    batch_depth: usize,
    // Sources written while a batch was open, in write order
    pending: Vec<usize>,
    queued: HashSet<usize>,
    // Callbacks waiting for the outermost batch to close
    deferred: Vec<Deferred>,
}

impl ReactiveContext {
    fn new() -> Self {
        Self {
            current_observer: None,
            dependencies: HashMap::new(),
            observer_deps: HashMap::new(),
            observers: HashMap::new(),
            memo_dirty: HashMap::new(),
            batch_depth: 0,
            pending: Vec::new(),
            queued: HashSet::new(),
            deferred: Vec::new(),
        }
    }

    /// Forget every source the observer read during its last run.
    fn unsubscribe(&mut self, observer_id: usize) {
        if let Some(old_deps) = self.observer_deps.remove(&observer_id) {
            for source_id in old_deps {
                if let Some(deps) = self.dependencies.get_mut(&source_id) {
                    deps.remove(&observer_id);
                }
            }
        }
    }
}

/// Hybrid reactive runtime for managing reactive primitives.
///
/// Supports both a global runtime (default) and scoped runtimes for isolation.
/// The runtime tracks dependencies between signals, memos and effects, and
/// defers notification while a [batch](ReactiveRuntime::batch) is open.
///
/// Every primitive captures the runtime that was current when it was created
/// and talks to that runtime for the rest of its life.
///
/// # Examples
///
/// Using the default global runtime:
///
/// ```
/// use larder::Signal;
///
/// let signal = Signal::new(42);
/// assert_eq!(signal.get(), 42);
/// ```
///
/// Using scoped runtimes for isolation:
///
/// ```
/// use larder::runtime::ReactiveRuntime;
/// use larder::Signal;
///
/// ReactiveRuntime::scope(|| {
///     let signal = Signal::new(0);
///     assert_eq!(signal.get(), 0);
/// });
/// ```
pub struct ReactiveRuntime {
    next_id: AtomicUsize,
    context: Mutex<ReactiveContext>,
}

// Thread-local stack for scoped runtimes
thread_local! {
    static RUNTIME_STACK: RefCell<Vec<Arc<ReactiveRuntime>>> = const { RefCell::new(Vec::new()) };
}

/// Pops the runtime stack even when the scoped function panics.
struct StackGuard;

impl Drop for StackGuard {
    fn drop(&mut self) {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Restores the previous observer when an observed run ends.
struct ObserverGuard<'a> {
    runtime: &'a ReactiveRuntime,
    prev: Option<usize>,
}

impl Drop for ObserverGuard<'_> {
    fn drop(&mut self) {
        self.runtime.context().current_observer = self.prev;
    }
}

/// Closes a batch, flushes its pending notifications and then runs the
/// callbacks deferred to its end.
struct BatchGuard<'a> {
    runtime: &'a ReactiveRuntime,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let (pending, deferred) = {
            let mut ctx = self.runtime.context();
            ctx.batch_depth = ctx.batch_depth.saturating_sub(1);
            if ctx.batch_depth > 0 {
                return;
            }
            ctx.queued.clear();
            (
                std::mem::take(&mut ctx.pending),
                std::mem::take(&mut ctx.deferred),
            )
        };

        // Writes made before a panic stay applied, so memos must still go
        // stale; effects and deferred callbacks are not run while unwinding.
        if std::thread::panicking() {
            self.runtime.flush(pending, false);
            drop(deferred);
            return;
        }
        self.runtime.flush(pending, true);
        for task in deferred {
            task();
        }
    }
}

impl ReactiveRuntime {
    /// Create a new isolated runtime.
    ///
    /// This creates a completely independent reactive runtime with its own
    /// dependency graph. Useful for testing or creating isolated contexts.
    pub fn new() -> Arc<Self> {
        Arc::new(ReactiveRuntime {
            next_id: AtomicUsize::new(0),
            context: Mutex::new(ReactiveContext::new()),
        })
    }

    /// Run a function with a fresh isolated runtime.
    ///
    /// Primitives created inside keep the runtime alive for as long as they
    /// exist, so stores built here may outlive the call.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::runtime::ReactiveRuntime;
    /// use larder::Signal;
    ///
    /// let signal = ReactiveRuntime::scope(|| Signal::new(0));
    /// signal.set(3);
    /// assert_eq!(signal.get(), 3);
    /// ```
    pub fn scope<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        Self::with_runtime(Self::new(), f)
    }

    /// Get or create the global runtime (fallback).
    pub fn global() -> Arc<Self> {
        static RUNTIME: OnceLock<Arc<ReactiveRuntime>> = OnceLock::new();
        Arc::clone(RUNTIME.get_or_init(Self::new))
    }

    /// Get the current reactive runtime (scoped or global fallback).
    ///
    /// Returns the runtime from the top of the thread-local stack,
    /// or the global runtime if no scoped runtime is active.
    pub fn current() -> Arc<Self> {
        RUNTIME_STACK
            .with(|stack| stack.borrow().last().cloned())
            .unwrap_or_else(Self::global)
    }

    /// Run a function with a specific runtime as the current context.
    ///
    /// This pushes the runtime onto the thread-local stack for the duration
    /// of the function execution.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::runtime::ReactiveRuntime;
    /// use larder::Signal;
    ///
    /// let runtime = ReactiveRuntime::new();
    /// ReactiveRuntime::with_runtime(runtime, || {
    ///     let signal = Signal::new(42);
    ///     assert_eq!(signal.get(), 42);
    /// });
    /// ```
    pub fn with_runtime<F, R>(runtime: Arc<Self>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        RUNTIME_STACK.with(|stack| {
            stack.borrow_mut().push(runtime);
        });
        let _guard = StackGuard;
        f()
    }

    /// Clear all observers, dependencies, and pending notifications.
    ///
    /// IDs keep increasing across a clear, so handles created before it
    /// never alias primitives created after it.
    pub fn clear(&self) {
        let cleared = std::mem::replace(&mut *self.context(), ReactiveContext::new());
        // Effect closures may own signals whose drop needs the context lock.
        drop(cleared);
    }

    /// Run `f` with notifications deferred until it returns.
    ///
    /// Writes inside the batch apply immediately; memos are invalidated and
    /// effects re-run once, after the outermost batch closes. Batches nest.
    ///
    /// # Examples
    ///
    /// ```
    /// use larder::{create_memo, Signal};
    /// use larder::runtime::ReactiveRuntime;
    ///
    /// let a = Signal::new(1);
    /// let b = Signal::new(2);
    /// let sum = create_memo({
    ///     let (a, b) = (a.clone(), b.clone());
    ///     move || a.get() + b.get()
    /// });
    /// assert_eq!(sum.get(), 3);
    ///
    /// ReactiveRuntime::current().batch(|| {
    ///     a.set(10);
    ///     b.set(20);
    /// });
    /// assert_eq!(sum.get(), 30);
    /// ```
    pub fn batch<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.context().batch_depth += 1;
        let _guard = BatchGuard { runtime: self };
        f()
    }

    /// Run `task` once the outermost open batch has closed and flushed, or
    /// right away when no batch is open.
    ///
    /// Tasks queued by a batch that unwinds from a panic are dropped.
    pub(crate) fn defer(&self, task: Deferred) {
        {
            let mut ctx = self.context();
            if ctx.batch_depth > 0 {
                ctx.deferred.push(task);
                return;
            }
        }
        task();
    }

    /// Run `f` without recording any reads as dependencies.
    pub fn untrack<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.with_observer(None, f)
    }

    fn context(&self) -> MutexGuard<'_, ReactiveContext> {
        recover(self.context.lock())
    }

    /// Generate the next unique ID for a reactive primitive.
    pub(crate) fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Track a read of a source by the current observer.
    pub(crate) fn track_read(&self, source_id: usize) {
        let mut ctx = self.context();
        if let Some(observer) = ctx.current_observer {
            ctx.dependencies
                .entry(source_id)
                .or_default()
                .insert(observer);
            ctx.observer_deps
                .entry(observer)
                .or_default()
                .insert(source_id);
        }
    }

    /// Notify everything that depends on a source.
    ///
    /// Inside a batch the source is queued instead.
    pub(crate) fn notify_observers(&self, source_id: usize) {
        {
            let mut ctx = self.context();
            if ctx.batch_depth > 0 {
                if ctx.queued.insert(source_id) {
                    ctx.pending.push(source_id);
                }
                return;
            }
        }
        self.flush(vec![source_id], true);
    }

    fn flush(&self, sources: Vec<usize>, run_effects: bool) {
        if sources.is_empty() {
            return;
        }
        let effects = self.collect_stale(sources);
        if run_effects {
            for effect_id in effects {
                self.run_observer(effect_id);
            }
        }
    }

    /// Mark every memo downstream of `sources` dirty and return the effects
    /// that must re-run, each at most once.
    ///
    /// Memos that are already dirty are walked through as well: an earlier
    /// flush may have skipped their dependent effects.
    fn collect_stale(&self, sources: Vec<usize>) -> Vec<usize> {
        let mut ctx = self.context();
        let mut stack = sources;
        let mut visited = HashSet::new();
        let mut scheduled = HashSet::new();
        let mut effects = Vec::new();

        while let Some(source_id) = stack.pop() {
            if !visited.insert(source_id) {
                continue;
            }
            let observers: Vec<usize> = match ctx.dependencies.get(&source_id) {
                Some(observers) => observers.iter().copied().collect(),
                None => continue,
            };
            for observer_id in observers {
                if let Some(dirty) = ctx.memo_dirty.get_mut(&observer_id) {
                    *dirty = true;
                    stack.push(observer_id);
                } else if ctx.observers.contains_key(&observer_id)
                    && scheduled.insert(observer_id)
                {
                    effects.push(observer_id);
                }
            }
        }
        effects
    }

    /// Register an effect function under an observer ID.
    pub(crate) fn create_observer(&self, observer_id: usize, effect: Observer) {
        let replaced = {
            let mut ctx = self.context();
            ctx.unsubscribe(observer_id);
            ctx.observers.insert(observer_id, effect)
        };
        drop(replaced);
    }

    /// Run a registered effect, re-collecting its dependencies.
    pub(crate) fn run_observer(&self, observer_id: usize) {
        let effect = {
            let mut ctx = self.context();
            ctx.unsubscribe(observer_id);
            ctx.observers.get(&observer_id).cloned()
        };
        if let Some(effect) = effect {
            self.with_observer(Some(observer_id), || effect());
        }
    }

    /// Forget an observer (effect or memo) entirely.
    pub(crate) fn remove_observer(&self, observer_id: usize) {
        let removed = {
            let mut ctx = self.context();
            ctx.unsubscribe(observer_id);
            ctx.memo_dirty.remove(&observer_id);
            ctx.observers.remove(&observer_id)
        };
        drop(removed);
    }

    /// Forget a source (signal or memo) that is being dropped.
    pub(crate) fn remove_source(&self, source_id: usize) {
        let mut ctx = self.context();
        if let Some(observers) = ctx.dependencies.remove(&source_id) {
            for observer_id in observers {
                if let Some(deps) = ctx.observer_deps.get_mut(&observer_id) {
                    deps.remove(&source_id);
                }
            }
        }
        if ctx.queued.remove(&source_id) {
            ctx.pending.retain(|pending| *pending != source_id);
        }
    }

    /// Run a function with a specific observer (or none) as the current context.
    pub(crate) fn with_observer<F, R>(&self, observer_id: Option<usize>, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let prev = std::mem::replace(&mut self.context().current_observer, observer_id);
        let _restore = ObserverGuard {
            runtime: self,
            prev,
        };
        f()
    }

    /// Drop the dependencies an observer collected during its last run.
    pub(crate) fn clear_dependencies(&self, observer_id: usize) {
        self.context().unsubscribe(observer_id);
    }

    /// Register a memo and mark it as dirty initially.
    pub(crate) fn register_memo(&self, memo_id: usize) {
        self.context().memo_dirty.insert(memo_id, true);
    }

    /// Check if a memo is dirty (needs recomputation).
    pub(crate) fn is_memo_dirty(&self, memo_id: usize) -> bool {
        self.context()
            .memo_dirty
            .get(&memo_id)
            .copied()
            .unwrap_or(true)
    }

    /// Mark a memo as clean (after recomputation).
    pub(crate) fn mark_memo_clean(&self, memo_id: usize) {
        if let Some(dirty) = self.context().memo_dirty.get_mut(&memo_id) {
            *dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_effect, create_memo, Signal};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn scoped_runtime_is_current_inside_scope_only() {
        let outer = ReactiveRuntime::current();
        let inner = ReactiveRuntime::scope(ReactiveRuntime::current);
        assert!(!Arc::ptr_eq(&outer, &inner));
        assert!(Arc::ptr_eq(&outer, &ReactiveRuntime::current()));
    }

    #[test]
    fn runtime_stack_pops_after_panic() {
        let before = ReactiveRuntime::current();
        let result = std::panic::catch_unwind(|| {
            ReactiveRuntime::scope(|| panic!("boom"));
        });
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &ReactiveRuntime::current()));
    }

    #[test]
    fn batch_runs_effect_once_per_batch() {
        ReactiveRuntime::scope(|| {
            let a = Signal::new(0);
            let b = Signal::new(0);
            let runs = Arc::new(AtomicUsize::new(0));
            let seen = Arc::new(Mutex::new(Vec::new()));

            let _effect = create_effect({
                let (a, b) = (a.clone(), b.clone());
                let runs = runs.clone();
                let seen = seen.clone();
                move || {
                    runs.fetch_add(1, Ordering::SeqCst);
                    seen.lock().unwrap().push((a.get(), b.get()));
                }
            });

            ReactiveRuntime::current().batch(|| {
                a.set(1);
                b.set(2);
                a.set(3);
            });

            assert_eq!(runs.load(Ordering::SeqCst), 2);
            assert_eq!(*seen.lock().unwrap(), vec![(0, 0), (3, 2)]);
        });
    }

    #[test]
    fn nested_batches_flush_at_outermost() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(0);
            let runs = Arc::new(AtomicUsize::new(0));
            let _effect = create_effect({
                let a = a.clone();
                let runs = runs.clone();
                move || {
                    a.get();
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });

            runtime.batch(|| {
                runtime.batch(|| a.set(1));
                assert_eq!(runs.load(Ordering::SeqCst), 1);
                a.set(2);
            });
            assert_eq!(runs.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn panicking_batch_still_invalidates_memos() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(1);
            let doubled = create_memo({
                let a = a.clone();
                move || a.get() * 2
            });
            assert_eq!(doubled.get(), 2);

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.batch(|| {
                    a.set(5);
                    panic!("mutator failed halfway");
                })
            }));
            assert!(result.is_err());
            assert_eq!(doubled.get(), 10);
        });
    }

    #[test]
    fn effect_on_memo_survives_panicking_batch() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(1);
            let doubled = create_memo({
                let a = a.clone();
                move || a.get() * 2
            });
            let seen = Arc::new(Mutex::new(Vec::new()));
            let _effect = create_effect({
                let doubled = doubled.clone();
                let seen = seen.clone();
                move || seen.lock().unwrap().push(doubled.get())
            });

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                runtime.batch(|| {
                    a.set(2);
                    panic!("mutator failed halfway");
                })
            }));
            assert!(result.is_err());
            assert_eq!(*seen.lock().unwrap(), vec![2]);

            a.set(5);
            assert_eq!(*seen.lock().unwrap(), vec![2, 10]);
            a.set(6);
            assert_eq!(*seen.lock().unwrap(), vec![2, 10, 12]);
        });
    }

    #[test]
    fn effects_after_a_panicking_effect_keep_running() {
        ReactiveRuntime::scope(|| {
            let a = Signal::new(0);
            let doubled = create_memo({
                let a = a.clone();
                move || a.get() * 2
            });
            let _failing = create_effect({
                let a = a.clone();
                move || {
                    if a.get() == 1 {
                        panic!("effect failed");
                    }
                }
            });
            let seen = Arc::new(Mutex::new(Vec::new()));
            let _watcher = create_effect({
                let doubled = doubled.clone();
                let seen = seen.clone();
                move || seen.lock().unwrap().push(doubled.get())
            });

            // Whichever effect runs first, the watcher must hear about `2`.
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| a.set(1)));
            a.set(2);
            assert_eq!(seen.lock().unwrap().last(), Some(&4));
        });
    }

    #[test]
    fn repeated_writes_queue_a_source_once() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(0);
            runtime.batch(|| {
                for value in 1..=100 {
                    a.set(value);
                }
                assert_eq!(runtime.context().pending, vec![a.id()]);
            });
            assert!(runtime.context().pending.is_empty());
            assert!(runtime.context().queued.is_empty());
        });
    }

    #[test]
    fn deferred_tasks_wait_for_outermost_batch() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(0);
            let seen = Arc::new(Mutex::new(Vec::new()));

            runtime.batch(|| {
                runtime.batch(|| {
                    a.set(1);
                    runtime.defer(Box::new({
                        let (a, seen) = (a.clone(), seen.clone());
                        move || seen.lock().unwrap().push(a.get())
                    }));
                });
                assert!(seen.lock().unwrap().is_empty());
                a.set(2);
            });
            assert_eq!(*seen.lock().unwrap(), vec![2]);

            runtime.defer(Box::new({
                let seen = seen.clone();
                move || seen.lock().unwrap().push(0)
            }));
            assert_eq!(*seen.lock().unwrap(), vec![2, 0]);
        });
    }

    #[test]
    fn untracked_reads_do_not_subscribe() {
        ReactiveRuntime::scope(|| {
            let runtime = ReactiveRuntime::current();
            let a = Signal::new(1);
            let runs = Arc::new(AtomicUsize::new(0));
            let _effect = create_effect({
                let a = a.clone();
                let runs = runs.clone();
                let runtime = runtime.clone();
                move || {
                    runtime.untrack(|| a.get());
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });
            a.set(2);
            assert_eq!(runs.load(Ordering::SeqCst), 1);
        });
    }

    #[test]
    fn clear_drops_effects() {
        let runtime = ReactiveRuntime::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let signal = ReactiveRuntime::with_runtime(runtime.clone(), || {
            let signal = Signal::new(0);
            let effect = create_effect({
                let signal = signal.clone();
                let runs = runs.clone();
                move || {
                    signal.get();
                    runs.fetch_add(1, Ordering::SeqCst);
                }
            });
            std::mem::forget(effect);
            signal
        });

        runtime.clear();
        signal.set(1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }
}
