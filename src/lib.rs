//! # Larder
//!
//! Named, scoped stores with gated mutation, built on fine-grained signals.
//!
//! Larder provides two levels of abstraction for managing reactive state:
//!
//! ## Signals (Low-level primitives)
//!
//! Fine-grained reactive primitives the stores are made of:
//! - `Signal<T>` / `ReadSignal<T>` - Reactive values that notify dependents when changed
//! - `Memo<T>` - Computed values that automatically track dependencies
//! - `Effect` - Side effects that run when dependencies change
//! - `reactive_state!` - Records split into one signal per field
//!
//! ## Stores (High-level state management)
//!
//! - `create_store` - Assemble state, actions and getters from a `StoreConfig`
//! - `Mutate` - The single gateway through which state changes, batched per call
//! - `Scope` - Tree of provide/inject registries stores are installed into
//! - `use_store` - Resolve a store from the nearest scope that provided it
//!
//! ```
//! use larder::{create_store, reactive_state, use_store, GetState, Mutate, Scope, StoreConfig};
//!
//! reactive_state! {
//!     #[derive(Debug, Clone)]
//!     pub struct CounterState => CounterFields, CounterRefs {
//!         pub count: i32,
//!     }
//! }
//!
//! pub struct CounterActions {
//!     mutate: Mutate<CounterState>,
//! }
//!
//! impl CounterActions {
//!     pub fn inc(&self, by: i32) {
//!         self.mutate.apply(|state| state.count.update(|c| *c += by));
//!     }
//! }
//!
//! let counter = create_store(StoreConfig::new(
//!     "counterStore",
//!     CounterState { count: 0 },
//!     |mutate: Mutate<CounterState>, _get: GetState<CounterState>| CounterActions { mutate },
//! ))
//! .unwrap();
//!
//! let app = Scope::root("app");
//! counter.install(&app);
//!
//! app.child("counter-view").enter(|| {
//!     let store = use_store(&counter).unwrap();
//!     store.actions().inc(5);
//!     store.actions().inc(-2);
//!     assert_eq!(store.state().count.get(), 3);
//! });
//! ```

pub mod error;
pub mod runtime;
pub mod scope;
pub mod signal;
pub mod state;
pub mod store;

// Re-export main types for convenience
pub use error::StoreError;
pub use scope::{InjectionKey, Scope};
pub use signal::{
    computed, create_effect, create_memo, create_signal, Effect, Memo, ReadSignal, Signal,
};
pub use state::{make_readonly_view, make_reactive, to_field_refs, Reactive, Readonly, State};
pub use store::{
    create_store, use_store, use_store_in, GetState, Mutate, MutatorHook, Store, StoreApi,
    StoreConfig,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_works() {
        // Basic smoke test
        let (signal, set_signal) = create_signal(0);
        assert_eq!(signal.get(), 0);
        set_signal.set(42);
        assert_eq!(signal.get(), 42);
    }
}
