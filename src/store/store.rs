use super::config::StoreConfig;
use super::gateway::{GetState, Mutate};
use crate::error::StoreError;
use crate::runtime::ReactiveRuntime;
use crate::scope::InjectionKey;
use crate::state::{make_reactive, make_readonly_view, to_field_refs, State};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// What components get from a store: live state refs, actions and getters.
pub struct StoreApi<S: State, A, G = ()> {
    state: S::Refs,
    actions: A,
    getters: G,
}

impl<S: State, A, G> StoreApi<S, A, G> {
    /// Read-only per-field handles; always reflect the live state.
    pub fn state(&self) -> &S::Refs {
        &self.state
    }

    /// Operations built by the actions factory.
    pub fn actions(&self) -> &A {
        &self.actions
    }

    /// Derived values built by the getters factory.
    pub fn getters(&self) -> &G {
        &self.getters
    }

    /// Copy the current state out into a plain record.
    pub fn snapshot(&self) -> S {
        S::snapshot(&self.state)
    }
}

impl<S: State, A, G> fmt::Debug for StoreApi<S, A, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreApi")
            .field("state", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

/// A named store: its api plus the key it is provided under.
///
/// Built once by [`create_store`] and immutable afterwards; the state it
/// wraps changes only through the store's [`Mutate`] gateway. Cloning is
/// cheap and yields the same store.
pub struct Store<S: State, A, G = ()> {
    pub(crate) name: Arc<str>,
    pub(crate) api: Arc<StoreApi<S, A, G>>,
    pub(crate) key: InjectionKey<StoreApi<S, A, G>>,
}

impl<S: State, A, G> Store<S, A, G> {
    /// Configured name, used in errors and logs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The api assembled at construction.
    pub fn api(&self) -> &Arc<StoreApi<S, A, G>> {
        &self.api
    }

    /// Key the api is provided under; unique to this store.
    pub fn injection_key(&self) -> &InjectionKey<StoreApi<S, A, G>> {
        &self.key
    }
}

impl<S: State, A, G> Clone for Store<S, A, G> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            api: Arc::clone(&self.api),
            key: self.key.clone(),
        }
    }
}

impl<S: State, A, G> fmt::Debug for Store<S, A, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Build a store from its configuration.
///
/// The factories run exactly once, here. Actions receive the mutation
/// gateway and read access; getters receive the read-only view. The
/// returned store holds a freshly minted injection key, so stores sharing a
/// name stay independent.
///
/// Fails with [`StoreError::EmptyName`] when the configured name is empty.
pub fn create_store<S, A, G>(config: StoreConfig<S, A, G>) -> Result<Store<S, A, G>, StoreError>
where
    S: State,
{
    let StoreConfig {
        name,
        initial_state,
        actions_creator,
        getters_creator,
        mutator_hook,
    } = config;

    if name.is_empty() {
        return Err(StoreError::EmptyName);
    }
    let name: Arc<str> = Arc::from(name);

    let runtime = ReactiveRuntime::current();
    let state = make_reactive(initial_state);
    let view = make_readonly_view(&state);

    let mutate = Mutate::new(
        Arc::clone(&name),
        runtime,
        state,
        view.clone(),
        mutator_hook,
    );
    let actions = actions_creator(mutate, GetState::new(view.clone()));
    let getters = getters_creator(&view);

    let api = Arc::new(StoreApi {
        state: to_field_refs(&view),
        actions,
        getters,
    });
    let key = InjectionKey::new(Arc::clone(&name));
    debug!(store = %name, ?key, "Created store");

    Ok(Store { name, api, key })
}
