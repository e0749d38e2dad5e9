use std::sync::Arc;

use shared::domain::PostCollection;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    error::{FetchError, FetchStateError},
    executor::PostsQueryExecutor,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FetchState {
    #[default]
    Loading,
    Empty,
    Failure(String),
    Success(PostCollection),
}

impl FetchState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    fn settle(outcome: Result<PostCollection, FetchError>) -> Self {
        match outcome {
            Ok(posts) if posts.is_empty() => Self::Empty,
            Ok(posts) => Self::Success(posts),
            Err(error) => Self::Failure(error.message().to_string()),
        }
    }
}

/// One fetch cycle: starts in `Loading` and settles exactly once.
#[derive(Debug, Default)]
pub struct FetchStateMachine {
    state: FetchState,
}

impl FetchStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &FetchState {
        &self.state
    }

    /// Applies the executor's outcome. A settled machine rejects further outcomes
    /// and keeps its state.
    pub fn resolve(
        &mut self,
        outcome: Result<PostCollection, FetchError>,
    ) -> Result<&FetchState, FetchStateError> {
        if self.state.is_terminal() {
            return Err(FetchStateError::AlreadySettled);
        }
        self.state = FetchState::settle(outcome);
        Ok(&self.state)
    }
}

/// A mounted fetch. Dropping it lets the request finish and discards the result;
/// `teardown` aborts the request.
#[derive(Debug)]
pub struct FetchHandle {
    state: watch::Receiver<FetchState>,
    task: JoinHandle<()>,
}

/// Starts the single fetch for a freshly mounted posts list.
pub fn mount(executor: Arc<dyn PostsQueryExecutor>) -> FetchHandle {
    let (tx, rx) = watch::channel(FetchState::Loading);
    debug!("posts fetch mounted");

    let task = tokio::spawn(async move {
        let mut machine = FetchStateMachine::new();
        let outcome = executor.fetch_all_posts().await;
        let state = match machine.resolve(outcome) {
            Ok(state) => state.clone(),
            Err(error) => {
                warn!(%error, "dropping fetch outcome");
                return;
            }
        };

        match &state {
            FetchState::Failure(message) => warn!(%message, "posts fetch failed"),
            FetchState::Success(posts) => info!(count = posts.len(), "posts fetch succeeded"),
            FetchState::Empty => info!("posts fetch returned no posts"),
            FetchState::Loading => {}
        }

        if tx.send(state).is_err() {
            debug!("posts list no longer mounted; discarding result");
        }
    });

    FetchHandle { state: rx, task }
}

impl FetchHandle {
    pub fn current(&self) -> FetchState {
        self.state.borrow().clone()
    }

    /// A receiver that observes every transition not yet seen by this handle.
    pub fn subscribe(&self) -> watch::Receiver<FetchState> {
        self.state.clone()
    }

    pub async fn settled(&mut self) -> Result<FetchState, FetchStateError> {
        let state = self
            .state
            .wait_for(FetchState::is_terminal)
            .await
            .map_err(|_| FetchStateError::Detached)?;
        Ok(state.clone())
    }

    pub fn teardown(self) {
        self.task.abort();
        debug!("posts fetch torn down");
    }
}

#[cfg(test)]
#[path = "tests/fetch_tests.rs"]
mod tests;
