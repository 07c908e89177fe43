use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_KEY: AtomicU64 = AtomicU64::new(0);

/// Opaque, typed key for values provided into a [`Scope`](super::Scope).
///
/// Every call to [`InjectionKey::new`] mints a key no other call can
/// produce. The description is only used for logging and debugging; two
/// keys with the same description never resolve each other's values.
pub struct InjectionKey<T> {
    id: u64,
    description: Arc<str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> InjectionKey<T> {
    /// Mint a fresh key.
    pub fn new(description: impl Into<Arc<str>>) -> Self {
        Self {
            id: NEXT_KEY.fetch_add(1, Ordering::Relaxed),
            description: description.into(),
            _marker: PhantomData,
        }
    }

    /// Human-readable description given at creation.
    pub fn description(&self) -> &str {
        &self.description
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }
}

impl<T> Clone for InjectionKey<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            description: Arc::clone(&self.description),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for InjectionKey<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for InjectionKey<T> {}

impl<T> Hash for InjectionKey<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for InjectionKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionKey")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish()
    }
}
