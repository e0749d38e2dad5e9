use super::{normalize_database_url, prepare_database_url, settings_from_sources, Settings};

use std::collections::HashMap;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn defaults_point_at_all_posts_index() {
    let settings = settings_from_sources(None, env_from(&[]));
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.posts_index, "all_posts");
    assert_eq!(settings.page_size, 64);
}

#[test]
fn file_values_override_defaults() {
    let file = r#"
bind_addr = "0.0.0.0:9000"
database_url = "sqlite://./blog.db"
posts_index = "published_posts"
page_size = 10
"#;
    let settings = settings_from_sources(Some(file), env_from(&[]));
    assert_eq!(settings.server_bind, "0.0.0.0:9000");
    assert_eq!(settings.database_url, "sqlite://./blog.db");
    assert_eq!(settings.posts_index, "published_posts");
    assert_eq!(settings.posts_collection, "posts");
    assert_eq!(settings.page_size, 10);
}

#[test]
fn env_overrides_file_and_prefixed_keys_win() {
    let file = "bind_addr = \"0.0.0.0:9000\"\n";
    let settings = settings_from_sources(
        Some(file),
        env_from(&[
            ("SERVER_BIND", "127.0.0.1:1000"),
            ("APP__BIND_ADDR", "127.0.0.1:2000"),
            ("APP__PAGE_SIZE", "5"),
        ]),
    );
    assert_eq!(settings.server_bind, "127.0.0.1:2000");
    assert_eq!(settings.page_size, 5);
}

#[test]
fn malformed_sources_fall_back_to_defaults() {
    let settings = settings_from_sources(
        Some("page_size = \"lots\""),
        env_from(&[("APP__MAX_QUERY_BYTES", "huge")]),
    );
    assert_eq!(settings, Settings::default());
}

#[test]
fn page_size_is_clamped_to_store_limits() {
    let settings = settings_from_sources(None, env_from(&[("APP__PAGE_SIZE", "0")]));
    assert_eq!(settings.page_size, 1);
}

#[test]
fn normalizes_plain_file_path_to_sqlite_url() {
    assert_eq!(
        normalize_database_url("./data/test.db"),
        "sqlite://./data/test.db"
    );
}

#[test]
fn keeps_windows_absolute_path_with_single_sqlite_colon() {
    assert_eq!(
        normalize_database_url("sqlite:C:\\Users\\alice\\test.db"),
        "sqlite:C:/Users/alice/test.db"
    );
}

#[test]
fn creates_parent_dir_for_sqlite_file() {
    let temp_root = tempfile::tempdir().expect("temp dir");
    let db_path = temp_root.path().join("data").join("test.db");

    prepare_database_url(db_path.to_string_lossy().as_ref()).expect("prepare db url");
    assert!(temp_root.path().join("data").exists());
}
