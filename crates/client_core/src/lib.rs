pub mod error;
pub mod executor;
pub mod fetch;
pub mod view;

pub use error::{FetchError, FetchStateError};
pub use executor::{GraphQlPostsExecutor, PostsQueryExecutor};
pub use fetch::{mount, FetchHandle, FetchState, FetchStateMachine};
pub use view::{select_view, View};
