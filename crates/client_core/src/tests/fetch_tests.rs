use super::*;
use crate::view::{select_view, View};
use async_trait::async_trait;
use shared::domain::Post;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{oneshot, Mutex};

struct ScriptedExecutor {
    outcome: Result<PostCollection, FetchError>,
    calls: AtomicUsize,
}

impl ScriptedExecutor {
    fn posts(titles: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(titles.iter().map(|t| Post::new(*t)).collect()),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(FetchError::new(message)),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PostsQueryExecutor for ScriptedExecutor {
    async fn fetch_all_posts(&self) -> Result<PostCollection, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

/// Holds the fetch open until the test releases it.
struct GatedExecutor {
    gate: Mutex<Option<oneshot::Receiver<Result<PostCollection, FetchError>>>>,
}

impl GatedExecutor {
    fn new() -> (Arc<Self>, oneshot::Sender<Result<PostCollection, FetchError>>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(Self {
                gate: Mutex::new(Some(rx)),
            }),
            tx,
        )
    }
}

#[async_trait]
impl PostsQueryExecutor for GatedExecutor {
    async fn fetch_all_posts(&self) -> Result<PostCollection, FetchError> {
        let rx = self.gate.lock().await.take();
        match rx {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::new("gate dropped"))),
            None => Err(FetchError::new("fetched twice")),
        }
    }
}

struct PendingExecutor;

#[async_trait]
impl PostsQueryExecutor for PendingExecutor {
    async fn fetch_all_posts(&self) -> Result<PostCollection, FetchError> {
        std::future::pending().await
    }
}

async fn settle_view(executor: Arc<dyn PostsQueryExecutor>) -> View {
    let mut handle = mount(executor);
    let state = handle.settled().await.expect("settled");
    select_view(&state)
}

#[tokio::test]
async fn empty_result_shows_empty_indicator() {
    let view = settle_view(ScriptedExecutor::posts(&[])).await;
    assert_eq!(view, View::Empty);
    assert_eq!(view.to_string(), "No posts yet!");
}

#[tokio::test]
async fn single_post_shows_one_item_list() {
    let view = settle_view(ScriptedExecutor::posts(&["Hello"])).await;
    assert_eq!(
        view,
        View::List {
            titles: vec!["Hello".to_string()]
        }
    );
}

#[tokio::test]
async fn two_posts_keep_executor_order() {
    let view = settle_view(ScriptedExecutor::posts(&["A", "B"])).await;
    assert_eq!(view.to_string(), "- A\n- B");
}

#[tokio::test]
async fn rejection_shows_message_verbatim() {
    let view = settle_view(ScriptedExecutor::failing("network down")).await;
    assert_eq!(
        view,
        View::Failure {
            message: "network down".to_string()
        }
    );
}

#[tokio::test]
async fn executor_runs_once_per_mount() {
    let executor = ScriptedExecutor::posts(&["A"]);
    let mut handle = mount(executor.clone());
    handle.settled().await.expect("settled");
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn starts_loading_then_settles_once() {
    let (executor, release) = GatedExecutor::new();
    let handle = mount(executor);
    assert_eq!(handle.current(), FetchState::Loading);
    let mut rx = handle.subscribe();

    release
        .send(Ok(PostCollection::from(vec![Post::new("Hello")])))
        .expect("release");
    rx.changed().await.expect("transition");
    assert_eq!(
        *rx.borrow(),
        FetchState::Success(PostCollection::from(vec![Post::new("Hello")]))
    );

    // The task ends after its single transition.
    assert!(rx.changed().await.is_err());
    assert!(handle.current().is_terminal());
}

#[tokio::test]
async fn teardown_before_resolution_stays_loading() {
    let handle = mount(Arc::new(PendingExecutor));
    let mut rx = handle.subscribe();
    handle.teardown();

    assert!(rx.changed().await.is_err());
    assert_eq!(*rx.borrow(), FetchState::Loading);
}

#[tokio::test]
async fn aborted_fetch_never_reaches_terminal_state() {
    let handle = mount(Arc::new(PendingExecutor));
    let mut rx = handle.subscribe();
    handle.teardown();
    assert!(rx.wait_for(FetchState::is_terminal).await.is_err());
}

#[tokio::test]
async fn dropped_handle_lets_request_finish() {
    let (executor, release) = GatedExecutor::new();
    let handle = mount(executor.clone());
    drop(handle);

    release.send(Ok(PostCollection::default())).expect("release");
    for _ in 0..100 {
        if Arc::strong_count(&executor) == 1 {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("fetch task did not finish");
}

#[test]
fn machine_starts_loading() {
    assert_eq!(*FetchStateMachine::new().state(), FetchState::Loading);
}

#[test]
fn empty_collection_is_never_success() {
    let mut machine = FetchStateMachine::new();
    let state = machine.resolve(Ok(PostCollection::default())).expect("resolve");
    assert_eq!(*state, FetchState::Empty);
}

#[test]
fn second_outcome_is_rejected_and_state_kept() {
    let mut machine = FetchStateMachine::new();
    machine
        .resolve(Ok(PostCollection::from(vec![Post::new("A")])))
        .expect("first");
    let err = machine
        .resolve(Err(FetchError::new("late failure")))
        .expect_err("second");
    assert_eq!(err, FetchStateError::AlreadySettled);
    assert_eq!(
        *machine.state(),
        FetchState::Success(PostCollection::from(vec![Post::new("A")]))
    );
}
