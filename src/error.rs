//! Crate-level error type for store construction and lookup.

/// Error returned when a store cannot be built, provided or resolved.
///
/// Every variant signals a wiring mistake rather than a runtime condition,
/// so callers usually treat it as fatal for the code path that hit it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No ancestor scope provided the store.
    ///
    /// Returned by [`use_store`](crate::use_store) and
    /// [`use_store_in`](crate::use_store_in) when the store was used before
    /// being installed into, or provided by, an enclosing scope.
    #[error("{name} has not been initialized")]
    UninitializedStore {
        /// Configured name of the store that was looked up.
        name: String,
    },

    /// [`Store::provide`](crate::Store::provide) was called while no scope
    /// was entered on the current thread.
    #[error("{name} cannot be provided outside of an entered scope")]
    NoActiveScope {
        /// Configured name of the store that was being provided.
        name: String,
    },

    /// A store was configured with an empty name.
    #[error("store name must not be empty")]
    EmptyName,
}
