//! Async action that loads posts, folding failures into the store's state.
//!
//! The "network" is a background thread answering through a oneshot channel
//! after a short delay.

use futures::channel::oneshot;
use futures::executor::block_on;
use larder::{
    create_effect, create_store, reactive_state, use_store, GetState, Mutate, Scope, StoreConfig,
    StoreError,
};
use std::future::Future;
use std::thread;
use std::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone)]
pub struct Post {
    pub user_id: u32,
    pub id: u32,
    pub title: String,
}

reactive_state! {
    #[derive(Debug, Clone)]
    pub struct PostState => PostFields, PostRefs {
        pub is_fetching: bool,
        pub posts: Vec<Post>,
        pub error: Option<String>,
    }
}

pub struct PostActions {
    mutate: Mutate<PostState>,
    get: GetState<PostState>,
}

impl PostActions {
    pub async fn fetch_posts<F>(&self, request: F)
    where
        F: Future<Output = Result<Vec<Post>, String>>,
    {
        self.mutate.apply(|state| {
            state.is_fetching.set(true);
            state.error.set(None);
        });

        // Anything may run while suspended here, including other actions.
        match request.await {
            Ok(posts) => self.mutate.apply(|state| state.posts.set(posts)),
            Err(error) => self.mutate.apply(|state| {
                state.posts.set(Vec::new());
                state.error.set(Some(error));
            }),
        }

        self.mutate.apply(|state| state.is_fetching.set(false));
    }

    pub fn clear_posts(&self) {
        self.mutate.apply(|state| state.posts.set(Vec::new()));
    }

    pub fn user_posts(&self, user_id: Option<u32>) -> Vec<Post> {
        self.get.get().posts.with(|posts| {
            posts
                .iter()
                .filter(|post| user_id.map_or(true, |id| post.user_id == id))
                .cloned()
                .collect()
        })
    }
}

/// Answer with `response` from another thread after a delay.
fn fake_request(
    response: Result<Vec<Post>, String>,
) -> impl Future<Output = Result<Vec<Post>, String>> {
    let (tx, rx) = oneshot::channel();
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(200));
        let _ = tx.send(response);
    });
    async move {
        rx.await
            .unwrap_or_else(|_| Err("request cancelled".to_string()))
    }
}

fn main() -> Result<(), StoreError> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let posts = create_store(StoreConfig::new(
        "postStore",
        PostState {
            is_fetching: false,
            posts: Vec::new(),
            error: None,
        },
        |mutate, get| PostActions { mutate, get },
    ))?;

    let app = Scope::root("app");
    let view = app.child("fetch-data-view");

    view.enter(|| posts.provide())?;

    view.enter(|| -> Result<(), StoreError> {
        let store = use_store(&posts)?;
        let state = store.state().clone();

        let _loader = create_effect(move || {
            if state.is_fetching.get() {
                println!("loading...");
            } else if let Some(error) = state.error.get() {
                println!("failed: {error}");
            } else {
                println!("{} posts", state.posts.with(Vec::len));
            }
        });

        let fetched = (1..=4)
            .map(|id| Post {
                user_id: id % 2 + 1,
                id,
                title: format!("Post number {id}"),
            })
            .collect();
        block_on(store.actions().fetch_posts(fake_request(Ok(fetched))));
        for post in store.actions().user_posts(Some(1)) {
            println!("user 1: #{} {}", post.id, post.title);
        }

        block_on(
            store
                .actions()
                .fetch_posts(fake_request(Err("503 Service Unavailable".to_string()))),
        );

        store.actions().clear_posts();
        Ok(())
    })?;

    // The store was provided by the view, not the application.
    if let Err(err) = app.enter(|| use_store(&posts)) {
        println!("outside the view: {err}");
    }

    Ok(())
}
