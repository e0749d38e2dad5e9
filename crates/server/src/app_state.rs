use server_api::ApiContext;
use storage::Storage;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) storage: Storage,
    pub(crate) max_query_bytes: usize,
}
