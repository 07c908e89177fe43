//! Counter store installed at the application root and used from a nested
//! view, with a getter and a post-mutation hook that logs every change.
//!
//! Run with `RUST_LOG=debug cargo run --example counter` to see the store's
//! own logging as well.

use larder::{
    create_effect, create_store, reactive_state, use_store, GetState, Memo, Mutate, Scope,
    StoreConfig, StoreError,
};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

reactive_state! {
    #[derive(Debug, Clone)]
    pub struct CounterState => CounterFields, CounterRefs {
        pub count: i32,
        pub history: Vec<i32>,
    }
}

pub struct CounterActions {
    mutate: Mutate<CounterState>,
    get: GetState<CounterState>,
}

impl CounterActions {
    pub fn inc_count(&self, val: i32) {
        self.mutate.apply(|state| {
            state.count.update(|count| *count += val);
            let count = state.count.get();
            state.history.update(|history| history.push(count));
        });
    }

    pub fn clear_count(&self) {
        self.mutate.apply(|state| {
            state.count.set(0);
            state.history.update(|history| history.push(0));
        });
    }

    pub fn mult_count(&self, val: i32) -> i32 {
        self.get.get().count.get() * val
    }
}

pub struct CounterGetters {
    pub double_count: Memo<i32>,
    pub changes: Memo<usize>,
}

fn main() -> Result<(), StoreError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let counter = create_store(
        StoreConfig::new(
            "counterStore",
            CounterState {
                count: 0,
                history: vec![0],
            },
            |mutate, get| CounterActions { mutate, get },
        )
        .with_getters(|state| CounterGetters {
            double_count: state.computed(|s| s.count.get() * 2),
            changes: state.computed(|s| s.history.with(Vec::len) - 1),
        })
        .with_mutator_hook(|state| {
            let snapshot = state.snapshot();
            info!(count = snapshot.count, "counter changed");
        }),
    )?;

    let app = Scope::root("app");
    counter.install(&app);

    app.child("counter-view").enter(|| -> Result<(), StoreError> {
        let store = use_store(&counter)?;
        let state = store.state().clone();
        let getters = store.getters();

        let _display = create_effect(move || {
            println!("count: {}", state.count.get());
        });

        store.actions().inc_count(5);
        store.actions().inc_count(-2);
        println!("double: {}", getters.double_count.get());
        println!("count x 10: {}", store.actions().mult_count(10));

        store.actions().clear_count();
        println!(
            "double: {}, changes: {}",
            getters.double_count.get(),
            getters.changes.get()
        );
        Ok(())
    })?;

    // A store that was never installed fails loudly.
    let orphan = create_store(StoreConfig::new(
        "orphanStore",
        CounterState {
            count: 0,
            history: Vec::new(),
        },
        |mutate, get| CounterActions { mutate, get },
    ))?;
    if let Err(err) = app.enter(|| use_store(&orphan)) {
        println!("expected failure: {err}");
    }

    Ok(())
}
