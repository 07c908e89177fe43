use super::store::{Store, StoreApi};
use crate::error::StoreError;
use crate::scope::Scope;
use crate::state::State;
use std::sync::Arc;
use tracing::{debug, error};

impl<S, A, G> Store<S, A, G>
where
    S: State,
    A: Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    /// Make the store reachable from `scope` and all of its descendants.
    ///
    /// Meant to be called once on the application's root scope. Installing
    /// again into the same scope replaces the earlier entry; installing into
    /// several scopes exposes the same shared state from each of them.
    pub fn install(&self, scope: &Scope) {
        debug!(store = %self.name, scope = %scope.label(), "Installing store");
        scope.provide(&self.key, Arc::clone(&self.api));
    }

    /// Provide the store from the scope currently entered on this thread.
    ///
    /// Lets part of the tree own a store instead of the whole application.
    /// Fails with [`StoreError::NoActiveScope`] outside
    /// [`Scope::enter`].
    pub fn provide(&self) -> Result<(), StoreError> {
        let scope = Scope::current().ok_or_else(|| StoreError::NoActiveScope {
            name: self.name.to_string(),
        })?;
        self.install(&scope);
        Ok(())
    }
}

/// Resolve a store from the scope currently entered on this thread.
///
/// Returns the api assembled by [`create_store`](crate::create_store) as
/// provided by the nearest enclosing scope. Fails with
/// [`StoreError::UninitializedStore`] when no scope is entered or none of
/// the entered scope's ancestors installed the store.
///
/// # Examples
///
/// ```
/// use larder::{create_store, reactive_state, use_store, Scope, StoreConfig, StoreError};
///
/// reactive_state! {
///     #[derive(Clone)]
///     pub struct Flags => FlagsFields, FlagsRefs {
///         pub dark_mode: bool,
///     }
/// }
///
/// let store = create_store(StoreConfig::new("flags", Flags { dark_mode: true }, |_, _| ())).unwrap();
///
/// let app = Scope::root("app");
/// let err = app.enter(|| use_store(&store)).unwrap_err();
/// assert_eq!(err, StoreError::UninitializedStore { name: "flags".into() });
///
/// store.install(&app);
/// app.child("settings").enter(|| {
///     let flags = use_store(&store).unwrap();
///     assert!(flags.state().dark_mode.get());
/// });
/// ```
pub fn use_store<S, A, G>(store: &Store<S, A, G>) -> Result<Arc<StoreApi<S, A, G>>, StoreError>
where
    S: State,
    A: Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    match Scope::current() {
        Some(scope) => use_store_in(&scope, store),
        None => Err(uninitialized(store, "<none>")),
    }
}

/// Resolve a store from an explicit scope.
///
/// Same as [`use_store`] but takes the scope as a parameter instead of
/// reading the thread's entered scope.
pub fn use_store_in<S, A, G>(
    scope: &Scope,
    store: &Store<S, A, G>,
) -> Result<Arc<StoreApi<S, A, G>>, StoreError>
where
    S: State,
    A: Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    scope
        .inject(&store.key)
        .ok_or_else(|| uninitialized(store, scope.label()))
}

fn uninitialized<S: State, A, G>(store: &Store<S, A, G>, scope: &str) -> StoreError {
    error!(store = %store.name, scope, "Store used before it was installed");
    StoreError::UninitializedStore {
        name: store.name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ReactiveRuntime;
    use crate::store::{create_store, GetState, Mutate, StoreConfig};

    crate::reactive_state! {
        #[derive(Debug, Clone)]
        struct Session => SessionFields, SessionRefs {
            user: Option<String>,
        }
    }

    struct SessionActions {
        mutate: Mutate<Session>,
        #[allow(dead_code)]
        get: GetState<Session>,
    }

    impl SessionActions {
        fn log_in(&self, user: &str) {
            let user = user.to_string();
            self.mutate.apply(|s| s.user.set(Some(user)));
        }
    }

    fn session_store() -> Store<Session, SessionActions> {
        create_store(StoreConfig::new(
            "sessionStore",
            Session { user: None },
            |mutate, get| SessionActions { mutate, get },
        ))
        .unwrap()
    }

    #[test]
    fn lookup_without_install_names_the_store() {
        ReactiveRuntime::scope(|| {
            let store = session_store();
            let app = Scope::root("app");

            assert_eq!(
                use_store_in(&app, &store).unwrap_err(),
                StoreError::UninitializedStore {
                    name: "sessionStore".to_string()
                }
            );
            assert!(matches!(
                use_store(&store),
                Err(StoreError::UninitializedStore { .. })
            ));
        });
    }

    #[test]
    fn installed_store_resolves_to_the_constructed_api() {
        ReactiveRuntime::scope(|| {
            let store = session_store();
            let app = Scope::root("app");
            store.install(&app);

            let page = app.child("page");
            let api = use_store_in(&page, &store).unwrap();
            assert!(Arc::ptr_eq(&api, store.api()));
            assert!(std::ptr::eq(api.actions(), store.api().actions()));
        });
    }

    #[test]
    fn provide_scopes_store_to_a_subtree() {
        ReactiveRuntime::scope(|| {
            let store = session_store();
            let app = Scope::root("app");
            let profile = app.child("profile");
            let sidebar = app.child("sidebar");

            assert_eq!(
                store.provide(),
                Err(StoreError::NoActiveScope {
                    name: "sessionStore".to_string()
                })
            );

            profile.enter(|| store.provide()).unwrap();

            profile.child("avatar").enter(|| {
                let api = use_store(&store).unwrap();
                api.actions().log_in("ada");
            });
            assert!(use_store_in(&sidebar, &store).is_err());
            assert!(use_store_in(&app, &store).is_err());
            assert_eq!(store.api().state().user.get().as_deref(), Some("ada"));
        });
    }

    #[test]
    fn lookup_does_not_change_install_state() {
        ReactiveRuntime::scope(|| {
            let store = session_store();
            let app = Scope::root("app");

            assert!(use_store_in(&app, &store).is_err());
            assert!(use_store_in(&app, &store).is_err());
            assert!(!app.provides(store.injection_key()));

            store.install(&app);
            assert!(use_store_in(&app, &store).is_ok());
            assert!(use_store_in(&app, &store).is_ok());
        });
    }
}
