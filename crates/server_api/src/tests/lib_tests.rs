use super::*;
use crate::schema::{ObjectType, TypeRef};
use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::json;
use shared::{domain::DocumentRef, protocol::posts_operation};
use storage::{Page, Storage};

async fn seeded_context(titles: &[&str], page_size: u32) -> ApiContext {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .create_index("all_posts", "posts")
        .await
        .expect("index");
    for title in titles {
        storage
            .create_document("posts", &json!({ "title": title }))
            .await
            .expect("document");
    }
    ApiContext::new(Arc::new(storage), "all_posts", page_size)
}

struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn paginate_index(
        &self,
        _index: &str,
        _page: PageRequest,
    ) -> anyhow::Result<Page<DocumentRef>> {
        Err(anyhow!("network down"))
    }

    async fn get_document(&self, _doc_ref: DocumentRef) -> anyhow::Result<Option<StoredDocument>> {
        Err(anyhow!("network down"))
    }
}

fn posts_request() -> GraphQlRequest {
    GraphQlRequest::from_document(&posts_operation())
}

#[tokio::test]
async fn resolves_posts_in_index_order_across_pages() {
    let ctx = seeded_context(&["A", "B", "C", "D", "E"], 2).await;
    let posts = resolve_posts(&ctx).await.expect("posts");
    let titles: Vec<_> = posts.into_iter().map(|post| post.title).collect();
    assert_eq!(titles, vec!["A", "B", "C", "D", "E"]);
}

#[tokio::test]
async fn resolves_empty_index_to_empty_list() {
    let ctx = seeded_context(&[], 64).await;
    assert!(resolve_posts(&ctx).await.expect("posts").is_empty());
}

#[tokio::test]
async fn keeps_duplicate_titles() {
    let ctx = seeded_context(&["same", "same"], 64).await;
    assert_eq!(resolve_posts(&ctx).await.expect("posts").len(), 2);
}

#[tokio::test]
async fn missing_title_violates_non_null_contract() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .create_index("all_posts", "posts")
        .await
        .expect("index");
    storage
        .create_document("posts", &json!({ "body": "untitled" }))
        .await
        .expect("document");
    let ctx = ApiContext::new(Arc::new(storage), "all_posts", 64);

    let err = resolve_posts(&ctx).await.expect_err("missing title");
    assert_eq!(err.code, ErrorCode::Internal);
    assert!(err.message.contains("Post.title"));
}

#[tokio::test]
async fn unknown_index_maps_to_not_found() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let ctx = ApiContext::new(Arc::new(storage), "all_posts", 64);
    let err = resolve_posts(&ctx).await.expect_err("no index");
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn executes_posts_operation() {
    let ctx = seeded_context(&["Hello"], 64).await;
    let response = execute(&ctx, &posts_request()).await;
    assert!(response.errors.is_empty());
    assert_eq!(
        response.data,
        Some(json!({ "posts": [{ "title": "Hello" }] }))
    );
}

#[tokio::test]
async fn store_failure_nulls_data_and_reports_path() {
    let ctx = ApiContext::new(Arc::new(UnreachableStore), "all_posts", 64);
    let response = execute(&ctx, &posts_request()).await;
    assert!(response.data.is_none());
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "network down");
    assert_eq!(response.errors[0].path, vec!["posts".to_string()]);
}

#[tokio::test]
async fn validation_errors_skip_resolution() {
    let ctx = ApiContext::new(Arc::new(UnreachableStore), "all_posts", 64);
    let request = GraphQlRequest {
        query: "{ posts { author } }".to_string(),
        operation_name: None,
        variables: None,
    };
    let response = execute(&ctx, &request).await;
    assert!(response.data.is_none());
    assert_eq!(
        response.errors[0].extensions.as_ref().map(|ext| ext.code),
        Some(ErrorCode::Validation)
    );
}

#[tokio::test]
async fn operation_name_must_match_document() {
    let ctx = seeded_context(&["Hello"], 64).await;
    let mut request = posts_request();
    request.operation_name = Some("DRAFTS".to_string());
    let response = execute(&ctx, &request).await;
    assert_eq!(
        response.errors[0].message,
        "Unknown operation named \"DRAFTS\"."
    );
}

#[tokio::test]
async fn failing_nullable_root_field_keeps_data_object() {
    let mut ctx = seeded_context(&["A"], 64).await;
    ctx.schema = Arc::new(
        Schema::new("Query")
            .with_type(
                ObjectType::new("Post")
                    .field(TITLE_FIELD, TypeRef::non_null(TypeRef::named("String"))),
            )
            .with_type(ObjectType::new("Query").field(
                "drafts",
                TypeRef::list(TypeRef::non_null(TypeRef::named("Post"))),
            )),
    );
    let request = GraphQlRequest {
        query: "{ drafts { title } }".to_string(),
        operation_name: None,
        variables: None,
    };

    let response = execute(&ctx, &request).await;
    assert_eq!(response.data, Some(json!({ "drafts": null })));
    assert_eq!(response.errors.len(), 1);
    assert_eq!(response.errors[0].message, "no resolver for Query.drafts");
    assert_eq!(response.errors[0].path, vec!["drafts".to_string()]);
}

#[test]
fn projection_keeps_only_selected_fields() {
    let value = json!([{ "title": "A", "body": "hidden" }]);
    let projected = project(&value, &[Selection::field("title")]);
    assert_eq!(projected, json!([{ "title": "A" }]));
}
