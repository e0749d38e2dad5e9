use async_trait::async_trait;
use reqwest::Client;
use shared::{
    domain::PostCollection,
    protocol::{posts_operation, GraphQlRequest, GraphQlResponse, PostsData},
};
use tracing::{debug, instrument};
use url::Url;

use crate::error::FetchError;

/// Runs the `POSTS` operation once and hands back every post.
#[async_trait]
pub trait PostsQueryExecutor: Send + Sync {
    async fn fetch_all_posts(&self) -> Result<PostCollection, FetchError>;
}

/// Executes the `POSTS` operation against a server's `/graphql` endpoint.
#[derive(Debug, Clone)]
pub struct GraphQlPostsExecutor {
    http: Client,
    endpoint: Url,
}

impl GraphQlPostsExecutor {
    pub fn new(http: Client, server_url: &str) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(server_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join("graphql")?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PostsQueryExecutor for GraphQlPostsExecutor {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn fetch_all_posts(&self) -> Result<PostCollection, FetchError> {
        let request = GraphQlRequest::from_document(&posts_operation());
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;
        let body: GraphQlResponse<PostsData> = response.json().await?;

        if let Some(first) = body.errors.into_iter().next() {
            return Err(FetchError::new(first.message));
        }
        let data = body
            .data
            .ok_or_else(|| FetchError::new("response contained no data"))?;
        debug!(count = data.posts.len(), "posts received");
        Ok(PostCollection::from(data.posts))
    }
}

#[cfg(test)]
#[path = "tests/executor_tests.rs"]
mod tests;
