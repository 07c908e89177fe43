use super::State;
use crate::signal::Memo;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Tracked, writable state: one signal per field.
///
/// Dereferences to the generated fields struct, so `state.count.set(1)`
/// writes the `count` field and notifies its readers.
pub struct Reactive<S: State> {
    fields: Arc<S::Fields>,
    refs: S::Refs,
}

impl<S: State> Reactive<S> {
    /// The writable per-field signals.
    pub fn fields(&self) -> &S::Fields {
        &self.fields
    }
}

impl<S: State> Deref for Reactive<S> {
    type Target = S::Fields;

    fn deref(&self) -> &S::Fields {
        &self.fields
    }
}

impl<S: State> Clone for Reactive<S> {
    fn clone(&self) -> Self {
        Self {
            fields: Arc::clone(&self.fields),
            refs: self.refs.clone(),
        }
    }
}

/// Read-only live view of a [`Reactive`] state.
///
/// Shares the signals of the state it was made from: every read sees the
/// current value and is tracked by whichever memo or effect is running.
pub struct Readonly<S: State> {
    refs: S::Refs,
}

impl<S: State> Readonly<S> {
    /// The read-only per-field signals.
    pub fn refs(&self) -> &S::Refs {
        &self.refs
    }

    /// Copy the current values out into a plain record.
    pub fn snapshot(&self) -> S {
        S::snapshot(&self.refs)
    }

    /// Derive a cached value from this view.
    ///
    /// The memo only recomputes after a field it read has changed.
    pub fn computed<T, F>(&self, derive: F) -> Memo<T>
    where
        F: Fn(&S::Refs) -> T + Send + Sync + 'static,
    {
        let refs = self.refs.clone();
        Memo::new(move || derive(&refs))
    }
}

impl<S: State> Deref for Readonly<S> {
    type Target = S::Refs;

    fn deref(&self) -> &S::Refs {
        &self.refs
    }
}

impl<S: State> Clone for Readonly<S> {
    fn clone(&self) -> Self {
        Self {
            refs: self.refs.clone(),
        }
    }
}

impl<S: State> fmt::Debug for Readonly<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readonly")
            .field("state", &std::any::type_name::<S>())
            .finish()
    }
}

/// Turn a plain record into tracked state.
pub fn make_reactive<S: State>(initial: S) -> Reactive<S> {
    let fields = initial.into_fields();
    let refs = S::field_refs(&fields);
    Reactive {
        fields: Arc::new(fields),
        refs,
    }
}

/// A read-only projection of the same underlying signals.
pub fn make_readonly_view<S: State>(state: &Reactive<S>) -> Readonly<S> {
    Readonly {
        refs: state.refs.clone(),
    }
}

/// Independent per-field handles that stay live after destructuring.
pub fn to_field_refs<S: State>(view: &Readonly<S>) -> S::Refs {
    view.refs.clone()
}
