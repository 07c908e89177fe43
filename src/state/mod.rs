//! Reactive state records.
//!
//! A store's state is a plain record declared with [`reactive_state!`]. The
//! macro generates two companion types next to it: a *fields* struct with one
//! writable [`Signal`](crate::Signal) per field (the tracked state a mutator
//! edits) and a *refs* struct with one [`ReadSignal`](crate::ReadSignal) per
//! field (the read-only view everyone else sees).

mod view;

pub use view::{make_readonly_view, make_reactive, to_field_refs, Reactive, Readonly};

/// A record that can be split into per-field signals.
///
/// Implemented by [`reactive_state!`]; implementing it by hand is possible
/// but rarely needed.
pub trait State: Sized + Send + Sync + 'static {
    /// One writable signal per field.
    type Fields: Send + Sync + 'static;
    /// One read-only signal per field, sharing the signals of `Fields`.
    type Refs: Clone + Send + Sync + 'static;

    /// Move every field into its own signal.
    fn into_fields(self) -> Self::Fields;

    /// Read-only handles onto the given signals.
    fn field_refs(fields: &Self::Fields) -> Self::Refs;

    /// Copy the current values back out into a plain record.
    fn snapshot(refs: &Self::Refs) -> Self;
}

/// Declare a state record together with its signal companions.
///
/// ```
/// larder::reactive_state! {
///     #[derive(Debug, Clone, PartialEq)]
///     pub struct CounterState => CounterFields, CounterRefs {
///         pub count: i32,
///         pub label: String,
///     }
/// }
///
/// use larder::State;
///
/// let fields = CounterState { count: 1, label: "clicks".into() }.into_fields();
/// fields.count.update(|c| *c += 1);
///
/// let refs = CounterState::field_refs(&fields);
/// assert_eq!(refs.count.get(), 2);
/// assert_eq!(CounterState::snapshot(&refs).label, "clicks");
/// ```
///
/// Every field type must be `Clone + Send + Sync + 'static`.
#[macro_export]
macro_rules! reactive_state {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident => $fields:ident, $refs:ident {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $ty:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $ty,
            )*
        }

        #[doc = concat!("Writable per-field signals of [`", stringify!($name), "`].")]
        $vis struct $fields {
            $(pub $field: $crate::Signal<$ty>,)*
        }

        #[doc = concat!("Read-only per-field signals of [`", stringify!($name), "`].")]
        #[derive(Clone)]
        $vis struct $refs {
            $(pub $field: $crate::ReadSignal<$ty>,)*
        }

        impl $crate::State for $name {
            type Fields = $fields;
            type Refs = $refs;

            fn into_fields(self) -> $fields {
                $fields {
                    $($field: $crate::Signal::new(self.$field),)*
                }
            }

            fn field_refs(fields: &$fields) -> $refs {
                $refs {
                    $($field: fields.$field.read_only(),)*
                }
            }

            fn snapshot(refs: &$refs) -> Self {
                Self {
                    $($field: refs.$field.get(),)*
                }
            }
        }
    };
}
