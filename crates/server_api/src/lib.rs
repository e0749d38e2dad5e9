use std::sync::Arc;

use serde_json::{Map, Value};
use shared::{
    domain::Post,
    error::{ApiError, ErrorCode},
    protocol::{GraphQlError, GraphQlRequest, GraphQlResponse, POSTS_FIELD, TITLE_FIELD},
    query::{OperationDocument, Selection},
};
use storage::{DocumentStore, IndexNotFound, PageRequest, StoredDocument};
use tracing::{debug, info, warn};

pub mod parser;
pub mod schema;

pub use parser::parse_operation;
pub use schema::Schema;

#[derive(Clone)]
pub struct ApiContext {
    pub store: Arc<dyn DocumentStore>,
    pub schema: Arc<Schema>,
    pub posts_index: String,
    pub page_size: u32,
}

impl ApiContext {
    pub fn new(store: Arc<dyn DocumentStore>, posts_index: impl Into<String>, page_size: u32) -> Self {
        Self {
            store,
            schema: Arc::new(Schema::posts()),
            posts_index: posts_index.into(),
            page_size,
        }
    }
}

/// Reads every post reachable through the configured index, page by page,
/// in index order.
pub async fn resolve_posts(ctx: &ApiContext) -> Result<Vec<Post>, ApiError> {
    let mut posts = Vec::new();
    let mut request = PageRequest::first(ctx.page_size);
    loop {
        let page = ctx
            .store
            .paginate_index(&ctx.posts_index, request)
            .await
            .map_err(store_error)?;
        for doc_ref in page.data {
            let document = ctx
                .store
                .get_document(doc_ref)
                .await
                .map_err(internal)?
                .ok_or_else(|| {
                    ApiError::internal(format!("document {doc_ref} disappeared during read"))
                })?;
            posts.push(decode_post(&document)?);
        }
        match page.after {
            Some(after) => request = request.starting_at(after),
            None => break,
        }
    }
    info!(index = %ctx.posts_index, count = posts.len(), "resolved posts");
    Ok(posts)
}

/// Runs one request end to end: parse, validate, resolve, project.
pub async fn execute(ctx: &ApiContext, request: &GraphQlRequest) -> GraphQlResponse<Value> {
    let document = match prepare(ctx, request) {
        Ok(document) => document,
        Err(err) => {
            debug!(error = %err, "rejected graphql request");
            return GraphQlResponse::failed(err.into());
        }
    };

    let mut data = Map::new();
    for selection in &document.selections {
        if data.contains_key(&selection.name) {
            continue;
        }
        match resolve_root_field(ctx, selection).await {
            Ok(resolved) => {
                data.insert(
                    selection.name.clone(),
                    project(&resolved, &selection.selections),
                );
            }
            Err(err) => {
                warn!(field = %selection.name, error = %err, "resolver failed");
                let error = GraphQlError::from(err).at_path(selection.name.clone());
                let nullable = ctx
                    .schema
                    .query_type()
                    .and_then(|root| root.find_field(&selection.name))
                    .is_some_and(|field| !field.ty.is_non_null());
                if !nullable {
                    return GraphQlResponse::failed(error);
                }
                data.insert(selection.name.clone(), Value::Null);
                return GraphQlResponse {
                    data: Some(Value::Object(data)),
                    errors: vec![error],
                };
            }
        }
    }
    GraphQlResponse::ok(Value::Object(data))
}

fn prepare(ctx: &ApiContext, request: &GraphQlRequest) -> Result<OperationDocument, ApiError> {
    let document = parse_operation(&request.query)?;
    if let Some(requested) = request.operation_name.as_deref() {
        if document.name.as_deref() != Some(requested) {
            return Err(ApiError::validation(format!(
                "Unknown operation named \"{requested}\"."
            )));
        }
    }
    ctx.schema.validate(&document)?;
    Ok(document)
}

async fn resolve_root_field(ctx: &ApiContext, selection: &Selection) -> Result<Value, ApiError> {
    match selection.name.as_str() {
        POSTS_FIELD => {
            let posts = resolve_posts(ctx).await?;
            serde_json::to_value(posts).map_err(|e| ApiError::internal(e.to_string()))
        }
        other => Err(ApiError::internal(format!("no resolver for Query.{other}"))),
    }
}

/// Keeps only the selected keys, descending through lists.
fn project(value: &Value, selections: &[Selection]) -> Value {
    if selections.is_empty() {
        return value.clone();
    }
    match value {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| project(item, selections))
                .collect(),
        ),
        Value::Object(fields) => Value::Object(
            selections
                .iter()
                .map(|selection| {
                    let field = fields.get(&selection.name).unwrap_or(&Value::Null);
                    (selection.name.clone(), project(field, &selection.selections))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

fn decode_post(document: &StoredDocument) -> Result<Post, ApiError> {
    match document.data.get(TITLE_FIELD) {
        Some(Value::String(title)) => Ok(Post::new(title.clone())),
        _ => Err(ApiError::internal(format!(
            "Cannot return null for non-nullable field Post.title ({})",
            document.doc_ref
        ))),
    }
}

fn store_error(err: anyhow::Error) -> ApiError {
    match err.downcast_ref::<IndexNotFound>() {
        Some(missing) => ApiError::new(ErrorCode::NotFound, missing.to_string()),
        None => internal(err),
    }
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
