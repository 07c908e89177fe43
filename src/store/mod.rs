//! Named stores with gated mutation.
//!
//! A store is assembled once from a [`StoreConfig`]: initial state, an
//! actions factory, optional getters and an optional post-mutation hook.
//! State only changes through the [`Mutate`] gateway handed to the actions
//! factory; everything else sees read-only views. Stores are made reachable
//! through a [`Scope`](crate::Scope) tree and resolved with [`use_store`].

mod binding;
mod config;
mod gateway;
mod store;

pub use binding::{use_store, use_store_in};
pub use config::{MutatorHook, StoreConfig};
pub use gateway::{GetState, Mutate};
pub use store::{create_store, Store, StoreApi};
