use super::config::MutatorHook;
use crate::runtime::ReactiveRuntime;
use crate::state::{Reactive, Readonly, State};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The only way to change a store's state.
///
/// Handed to the actions factory once, at store construction; actions keep
/// it and call [`apply`](Mutate::apply) as often as they need.
pub struct Mutate<S: State> {
    store: Arc<str>,
    runtime: Arc<ReactiveRuntime>,
    state: Reactive<S>,
    view: Readonly<S>,
    hook: Option<MutatorHook<S>>,
}

impl<S: State> Mutate<S> {
    pub(crate) fn new(
        store: Arc<str>,
        runtime: Arc<ReactiveRuntime>,
        state: Reactive<S>,
        view: Readonly<S>,
        hook: Option<MutatorHook<S>>,
    ) -> Self {
        Self {
            store,
            runtime,
            state,
            view,
            hook,
        }
    }

    /// Apply a synchronous mutation to the state.
    ///
    /// Writes inside `mutator` land in order and immediately; dependents are
    /// notified once, after it returns, so no observer ever sees half of a
    /// compound edit. Reads inside `mutator` are not tracked. The
    /// post-mutation hook, if any, runs last with the read-only view.
    ///
    /// A mutator may call `apply` again, directly or through another action.
    /// The nested edit joins the outer one, and every hook waits until the
    /// outermost edit has been applied and notified.
    ///
    /// Nothing is rolled back: if `mutator` or the hook panics, the writes
    /// already made stay applied. A panicking mutator skips the hooks.
    pub fn apply<F>(&self, mutator: F)
    where
        F: FnOnce(&S::Fields),
    {
        trace!(store = %self.store, "Applying mutation");
        self.runtime.batch(|| {
            self.runtime.untrack(|| mutator(self.state.fields()));
            if let Some(hook) = &self.hook {
                let hook = Arc::clone(hook);
                let view = self.view.clone();
                self.runtime.defer(Box::new(move || hook(&view)));
            }
        });
    }

    /// Name of the store this gateway writes to.
    pub fn store_name(&self) -> &str {
        &self.store
    }
}

impl<S: State> Clone for Mutate<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            runtime: Arc::clone(&self.runtime),
            state: self.state.clone(),
            view: self.view.clone(),
            hook: self.hook.clone(),
        }
    }
}

impl<S: State> fmt::Debug for Mutate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutate")
            .field("store", &self.store)
            .field("has_hook", &self.hook.is_some())
            .finish()
    }
}

/// Read access to a store's state from inside its actions.
pub struct GetState<S: State> {
    view: Readonly<S>,
}

impl<S: State> GetState<S> {
    pub(crate) fn new(view: Readonly<S>) -> Self {
        Self { view }
    }

    /// The read-only live view of the current state.
    pub fn get(&self) -> &Readonly<S> {
        &self.view
    }
}

impl<S: State> Clone for GetState<S> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
        }
    }
}

impl<S: State> fmt::Debug for GetState<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("GetState").field(&self.view).finish()
    }
}
