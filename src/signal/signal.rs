use crate::runtime::{recover, ReactiveRuntime};
use std::fmt;
use std::sync::{Arc, RwLock};

struct SignalInner<T> {
    id: usize,
    value: RwLock<T>,
    runtime: Arc<ReactiveRuntime>,
}

impl<T> Drop for SignalInner<T> {
    fn drop(&mut self) {
        self.runtime.remove_source(self.id);
    }
}

/// A reactive signal that holds a value and notifies dependents when changed.
///
/// Cloning a signal yields another handle to the same value.
pub struct Signal<T> {
    inner: Arc<SignalInner<T>>,
}

impl<T> Signal<T> {
    /// Create a new signal with the given initial value.
    pub fn new(initial: T) -> Self {
        let runtime = ReactiveRuntime::current();
        let id = runtime.next_id();

        Self {
            inner: Arc::new(SignalInner {
                id,
                value: RwLock::new(initial),
                runtime,
            }),
        }
    }

    /// Set a new value for the signal.
    pub fn set(&self, new_value: T) {
        *recover(self.inner.value.write()) = new_value;
        self.inner.runtime.notify_observers(self.inner.id);
    }

    /// Update the value in place using a function.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut value = recover(self.inner.value.write());
            f(&mut *value);
        }
        self.inner.runtime.notify_observers(self.inner.id);
    }

    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.runtime.track_read(self.inner.id);
        let value = recover(self.inner.value.read());
        f(&*value)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.inner.id
    }

    /// A handle to the same value that can only be read.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            signal: self.clone(),
        }
    }
}

impl<T: Clone> Signal<T> {
    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.with(T::clone)
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*recover(self.inner.value.read()))
            .finish()
    }
}

/// Read half of a signal.
///
/// Reads are tracked exactly like [`Signal`] reads; there is no way to write
/// through it.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> ReadSignal<T> {
    /// Read the value with a function without cloning.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.signal.with(f)
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> usize {
        self.signal.id()
    }
}

impl<T: Clone> ReadSignal<T> {
    /// Get the current value of the signal.
    pub fn get(&self) -> T {
        self.signal.get()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

/// Create a signal and return its read and write halves.
///
/// # Example
///
/// ```
/// use larder::create_signal;
///
/// let (count, set_count) = create_signal(0);
/// set_count.update(|n| *n += 1);
/// assert_eq!(count.get(), 1);
/// ```
pub fn create_signal<T>(initial: T) -> (ReadSignal<T>, Signal<T>) {
    let signal = Signal::new(initial);
    (signal.read_only(), signal)
}
