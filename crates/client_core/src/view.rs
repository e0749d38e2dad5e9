use std::fmt;

use crate::fetch::FetchState;

/// What the posts list shows for a given fetch state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Loading,
    Empty,
    Failure { message: String },
    List { titles: Vec<String> },
}

pub fn select_view(state: &FetchState) -> View {
    match state {
        FetchState::Loading => View::Loading,
        FetchState::Empty => View::Empty,
        FetchState::Failure(message) => View::Failure {
            message: message.clone(),
        },
        FetchState::Success(posts) => View::List {
            titles: posts.titles(),
        },
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Loading => f.write_str("Loading posts..."),
            View::Empty => f.write_str("No posts yet!"),
            View::Failure { message } => write!(f, "Error: {message}"),
            View::List { titles } => {
                for (i, title) in titles.iter().enumerate() {
                    if i > 0 {
                        f.write_str("\n")?;
                    }
                    write!(f, "- {title}")?;
                }
                Ok(())
            }
        }
    }
}
