use super::InjectionKey;
use crate::runtime::recover;
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tracing::{debug, trace};

type Provided = Arc<dyn Any + Send + Sync>;

struct ScopeInner {
    label: String,
    parent: Option<Scope>,
    provided: RwLock<HashMap<u64, Provided>>,
}

/// A node in a tree of provide/inject registries.
///
/// Values provided into a scope are visible to that scope and every
/// descendant; lookups walk from a scope towards the root and the nearest
/// provider wins. A root scope plays the part of the application, children
/// the parts of the tree beneath it.
///
/// Cloning a scope yields another handle to the same node.
///
/// # Examples
///
/// ```
/// use larder::{InjectionKey, Scope};
/// use std::sync::Arc;
///
/// let theme: InjectionKey<String> = InjectionKey::new("theme");
///
/// let app = Scope::root("app");
/// app.provide(&theme, Arc::new("dark".to_string()));
///
/// let panel = app.child("panel");
/// assert_eq!(panel.inject(&theme).as_deref().map(String::as_str), Some("dark"));
///
/// panel.provide(&theme, Arc::new("light".to_string()));
/// assert_eq!(panel.inject(&theme).as_deref().map(String::as_str), Some("light"));
/// assert_eq!(app.inject(&theme).as_deref().map(String::as_str), Some("dark"));
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

// Thread-local stack of entered scopes
thread_local! {
    static SCOPE_STACK: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

/// Pops the scope stack even when the entered function panics.
struct EnterGuard;

impl Drop for EnterGuard {
    fn drop(&mut self) {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Scope {
    /// Create a scope with no parent.
    pub fn root(label: impl Into<String>) -> Self {
        Self::with_parent(label.into(), None)
    }

    /// Create a scope beneath this one.
    pub fn child(&self, label: impl Into<String>) -> Self {
        Self::with_parent(label.into(), Some(self.clone()))
    }

    fn with_parent(label: String, parent: Option<Scope>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                label,
                parent,
                provided: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Label given at creation.
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// The enclosing scope, if any.
    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    /// Provide a value to this scope and its descendants.
    ///
    /// Providing the same key twice on one scope replaces the earlier value.
    pub fn provide<T>(&self, key: &InjectionKey<T>, value: Arc<T>)
    where
        T: Send + Sync + 'static,
    {
        let replaced = recover(self.inner.provided.write()).insert(key.id(), value);
        debug!(
            scope = %self.inner.label,
            key = %key.description(),
            replaced = replaced.is_some(),
            "Provided value"
        );
    }

    /// Resolve a key from this scope or the nearest ancestor providing it.
    pub fn inject<T>(&self, key: &InjectionKey<T>) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let mut scope = Some(self);
        while let Some(current) = scope {
            let found = recover(current.inner.provided.read())
                .get(&key.id())
                .cloned();
            if let Some(value) = found {
                trace!(
                    scope = %self.inner.label,
                    provider = %current.inner.label,
                    key = %key.description(),
                    "Resolved value"
                );
                return Arc::downcast::<T>(value).ok();
            }
            scope = current.parent();
        }
        trace!(scope = %self.inner.label, key = %key.description(), "No provider");
        None
    }

    /// Whether this scope itself, ignoring ancestors, provides the key.
    pub fn provides<T>(&self, key: &InjectionKey<T>) -> bool {
        recover(self.inner.provided.read()).contains_key(&key.id())
    }

    /// Run `f` with this scope as the current scope of the thread.
    ///
    /// Entered scopes nest; the innermost one is [`Scope::current`].
    pub fn enter<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(self.clone());
        });
        let _guard = EnterGuard;
        f()
    }

    /// The innermost scope entered on this thread.
    pub fn current() -> Option<Scope> {
        SCOPE_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("label", &self.inner.label)
            .field("parent", &self.parent().map(Scope::label))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inject_walks_ancestors() {
        let key: InjectionKey<u32> = InjectionKey::new("answer");
        let root = Scope::root("app");
        let leaf = root.child("page").child("widget");

        assert!(leaf.inject(&key).is_none());
        root.provide(&key, Arc::new(42));
        assert_eq!(leaf.inject(&key).as_deref(), Some(&42));
        assert!(root.provides(&key));
        assert!(!leaf.provides(&key));
    }

    #[test]
    fn siblings_do_not_see_each_other() {
        let key: InjectionKey<&'static str> = InjectionKey::new("slot");
        let root = Scope::root("app");
        let left = root.child("left");
        let right = root.child("right");

        left.provide(&key, Arc::new("left"));
        assert_eq!(left.inject(&key).as_deref(), Some(&"left"));
        assert!(right.inject(&key).is_none());
        assert!(root.inject(&key).is_none());
    }

    #[test]
    fn second_provide_replaces_first() {
        let key: InjectionKey<u8> = InjectionKey::new("value");
        let root = Scope::root("app");
        root.provide(&key, Arc::new(1));
        root.provide(&key, Arc::new(2));
        assert_eq!(root.inject(&key).as_deref(), Some(&2));
    }

    #[test]
    fn enter_nests_and_unwinds() {
        assert!(Scope::current().is_none());
        let root = Scope::root("app");
        let child = root.child("child");

        root.enter(|| {
            assert!(Scope::current().is_some_and(|s| s.ptr_eq(&root)));
            child.enter(|| {
                assert!(Scope::current().is_some_and(|s| s.ptr_eq(&child)));
            });
            assert!(Scope::current().is_some_and(|s| s.ptr_eq(&root)));

            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                child.enter(|| panic!("render failed"))
            }));
            assert!(result.is_err());
            assert!(Scope::current().is_some_and(|s| s.ptr_eq(&root)));
        });
        assert!(Scope::current().is_none());
    }
}
