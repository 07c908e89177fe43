use super::gateway::{GetState, Mutate};
use crate::state::{Readonly, State};
use std::fmt;
use std::sync::Arc;

pub(crate) type ActionsCreator<S, A> = Box<dyn FnOnce(Mutate<S>, GetState<S>) -> A>;
pub(crate) type GettersCreator<S, G> = Box<dyn FnOnce(&Readonly<S>) -> G>;

/// Observer called after every mutation with the read-only view of the
/// now-current state.
pub type MutatorHook<S> = Arc<dyn Fn(&Readonly<S>) + Send + Sync>;

/// Everything [`create_store`](crate::create_store) needs to build a store.
///
/// The actions factory is required; getters and the post-mutation hook are
/// optional. A store without getters has `()` in their place.
///
/// # Examples
///
/// ```
/// use larder::{create_store, reactive_state, GetState, Mutate, StoreConfig};
///
/// reactive_state! {
///     #[derive(Debug, Clone)]
///     pub struct CounterState => CounterFields, CounterRefs {
///         pub count: i32,
///     }
/// }
///
/// pub struct CounterActions {
///     mutate: Mutate<CounterState>,
///     get: GetState<CounterState>,
/// }
///
/// impl CounterActions {
///     pub fn inc(&self, by: i32) {
///         self.mutate.apply(|state| state.count.update(|c| *c += by));
///     }
///
///     pub fn times(&self, factor: i32) -> i32 {
///         self.get.get().count.get() * factor
///     }
/// }
///
/// let config = StoreConfig::new(
///     "counterStore",
///     CounterState { count: 0 },
///     |mutate, get| CounterActions { mutate, get },
/// )
/// .with_getters(|state| state.computed(|s| s.count.get() * 2))
/// .with_mutator_hook(|state| println!("count is now {}", state.count.get()));
///
/// assert_eq!(config.name(), "counterStore");
///
/// let store = create_store(config).unwrap();
/// store.api().actions().inc(3);
/// assert_eq!(store.api().getters().get(), 6);
/// assert_eq!(store.api().actions().times(10), 30);
/// ```
pub struct StoreConfig<S: State, A, G = ()> {
    pub(crate) name: String,
    pub(crate) initial_state: S,
    pub(crate) actions_creator: ActionsCreator<S, A>,
    pub(crate) getters_creator: GettersCreator<S, G>,
    pub(crate) mutator_hook: Option<MutatorHook<S>>,
}

impl<S: State, A> StoreConfig<S, A> {
    /// Configure an actions-only store.
    ///
    /// `name` identifies the store in errors and logs; it does not need to
    /// be unique.
    pub fn new<F>(name: impl Into<String>, initial_state: S, actions_creator: F) -> Self
    where
        F: FnOnce(Mutate<S>, GetState<S>) -> A + 'static,
    {
        Self {
            name: name.into(),
            initial_state,
            actions_creator: Box::new(actions_creator),
            getters_creator: Box::new(|_| ()),
            mutator_hook: None,
        }
    }
}

impl<S: State, A, G> StoreConfig<S, A, G> {
    /// Add a getters factory.
    ///
    /// It receives the read-only view and returns the getters, typically a
    /// struct of memos built with [`Readonly::computed`].
    pub fn with_getters<G2, F>(self, getters_creator: F) -> StoreConfig<S, A, G2>
    where
        F: FnOnce(&Readonly<S>) -> G2 + 'static,
    {
        StoreConfig {
            name: self.name,
            initial_state: self.initial_state,
            actions_creator: self.actions_creator,
            getters_creator: Box::new(getters_creator),
            mutator_hook: self.mutator_hook,
        }
    }

    /// Install an observer that runs after every mutation.
    ///
    /// Panics raised by the hook reach the caller of
    /// [`Mutate::apply`] after the mutation has taken effect.
    pub fn with_mutator_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Readonly<S>) + Send + Sync + 'static,
    {
        self.mutator_hook = Some(Arc::new(hook));
        self
    }

    /// Configured store name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<S: State, A, G> fmt::Debug for StoreConfig<S, A, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("has_mutator_hook", &self.mutator_hook.is_some())
            .finish_non_exhaustive()
    }
}
