//! Tree-scoped dependency injection.
//!
//! A [`Scope`] tree stands in for a component tree: values are provided at a
//! node under an [`InjectionKey`] and resolved from any descendant.

mod key;
mod scope;

pub use key::InjectionKey;
pub use scope::Scope;
