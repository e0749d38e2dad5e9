use serde::{Deserialize, Serialize};

use crate::{
    domain::Post,
    error::{ApiError, ErrorCode},
    query::{OperationDocument, Selection},
};

pub const POSTS_OPERATION_NAME: &str = "POSTS";
pub const POSTS_FIELD: &str = "posts";
pub const TITLE_FIELD: &str = "title";

/// The `POSTS` operation the posts list issues: every post, title only.
pub fn posts_operation() -> OperationDocument {
    OperationDocument::named(POSTS_OPERATION_NAME)
        .select(Selection::field(POSTS_FIELD).with(Selection::field(TITLE_FIELD)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<serde_json::Value>,
}

impl GraphQlRequest {
    pub fn from_document(document: &OperationDocument) -> Self {
        Self {
            query: document.to_string(),
            operation_name: document.name.clone(),
            variables: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphQlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQlError>,
}

impl<T> GraphQlResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn failed(error: GraphQlError) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ErrorExtensions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExtensions {
    pub code: ErrorCode,
}

impl GraphQlError {
    pub fn at_path(mut self, field: impl Into<String>) -> Self {
        self.path.push(field.into());
        self
    }
}

impl From<ApiError> for GraphQlError {
    fn from(value: ApiError) -> Self {
        Self {
            message: value.message,
            path: Vec::new(),
            extensions: Some(ErrorExtensions { code: value.code }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostsData {
    pub posts: Vec<Post>,
}
