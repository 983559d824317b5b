//! Unit tests for the RPC handler: all JSON-RPC methods dispatched by `handle_method`.
//!
//! These tests exercise every RPC method through the same code path used by the
//! real `linkshelf-rpc` binary, with the store in a temporary directory and an
//! offline page fetcher.

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tempfile::TempDir;

use linkshelf::app::App;
use linkshelf::rpc_handler::handle_method;
use linkshelf::services::page_fetcher::StaticPageFetcher;
use linkshelf::types::config::StoreConfig;
use linkshelf::types::page::PageMetadata;

/// Create a fresh App backed by a temp directory.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = StoreConfig::with_data_dir(tmp.path());
    let fetcher = StaticPageFetcher::new().with_page(
        "https://rust-lang.org",
        PageMetadata {
            title: "Rust Programming Language".to_string(),
            description: "A language empowering everyone".to_string(),
            thumbnail: Some("data:image/png;base64,aGk=".to_string()),
            fetch_failed: false,
        },
    );
    let mut app = App::with_fetcher(config, Arc::new(fetcher)).expect("Failed to init App");
    app.startup();
    (Mutex::new(app), tmp)
}

fn add(app: &Mutex<App>, params: Value) -> Value {
    handle_method(app, "record.add", &params).expect("record.add failed")
}

// ─── Unknown method ───

#[test]
fn test_unknown_method_returns_error() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "nonexistent.method", &json!({}));
    assert!(res.unwrap_err().contains("unknown method"));
}

// ─── Records ───

#[test]
fn test_record_add_uses_fetched_metadata() {
    let (app, _tmp) = setup();
    let res = add(&app, json!({
        "url": "https://rust-lang.org",
        "comment": "home",
        "rating": 8,
        "tags": "rust, lang"
    }));
    assert_eq!(res["id"], 1);
    assert_eq!(res["title"], "Rust Programming Language");
    assert_eq!(res["thumbnail"], "data:image/png;base64,aGk=");
    assert_eq!(res["fetchFailed"], false);
    assert_eq!(res["tags"], json!(["rust", "lang"]));
    assert_eq!(res["author"], "guest");
    assert_eq!(res["stars"], "★★★★★★★★☆☆");
}

#[test]
fn test_record_add_unknown_site_falls_back_to_host() {
    let (app, _tmp) = setup();
    let res = add(&app, json!({"url": "https://www.blocked.example/page"}));
    assert_eq!(res["title"], "blocked.example");
    assert_eq!(res["fetchFailed"], true);
    assert_eq!(res["rating"], 5.0);
}

#[test]
fn test_record_add_accepts_string_rating_and_tag_array() {
    let (app, _tmp) = setup();
    let res = add(&app, json!({"url": "https://a.example", "rating": "3", "tags": ["x", " y "]}));
    assert_eq!(res["rating"], 3.0);
    assert_eq!(res["tags"], json!(["x", "y"]));
}

#[test]
fn test_record_add_rejects_non_numeric_rating() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "record.add", &json!({"url": "https://a.example", "rating": "lots"}));
    assert!(res.unwrap_err().contains("invalid input"));
    let list = handle_method(&app, "record.list", &json!({})).unwrap();
    assert!(list.as_array().unwrap().is_empty());
}

#[test]
fn test_record_add_with_empty_url_skips_fetch() {
    let (app, _tmp) = setup();
    let res = add(&app, json!({"comment": "no link"}));
    assert_eq!(res["title"], "");
    assert_eq!(res["fetchFailed"], false);
    assert!(res.get("thumbnail").is_none());
}

#[test]
fn test_record_get_and_list() {
    let (app, _tmp) = setup();
    add(&app, json!({"url": "https://a.example"}));
    add(&app, json!({"url": "https://b.example"}));

    let got = handle_method(&app, "record.get", &json!({"id": 2})).unwrap();
    assert_eq!(got["url"], "https://b.example");

    let list = handle_method(&app, "record.list", &json!({})).unwrap();
    assert_eq!(list.as_array().unwrap().len(), 2);
}

#[test]
fn test_missing_record_reports_not_found() {
    let (app, _tmp) = setup();
    for method in ["record.get", "record.like", "record.unlike", "record.delete"] {
        let res = handle_method(&app, method, &json!({"id": 77}));
        assert_eq!(res.unwrap_err(), "not found", "method {}", method);
    }
    let res = handle_method(&app, "record.edit", &json!({"id": 77, "url": "https://a.example"}));
    assert_eq!(res.unwrap_err(), "not found");
}

#[test]
fn test_missing_id_param() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "record.get", &json!({}));
    assert_eq!(res.unwrap_err(), "missing id");
}

#[test]
fn test_record_edit() {
    let (app, _tmp) = setup();
    let created = add(&app, json!({"url": "https://a.example", "author": "alice"}));
    let edited = handle_method(&app, "record.edit", &json!({
        "id": 1,
        "url": "https://rust-lang.org",
        "comment": "moved",
        "rating": 9
    }))
    .unwrap();
    assert_eq!(edited["title"], "Rust Programming Language");
    assert_eq!(edited["author"], "alice");
    assert_eq!(edited["createdDate"], created["createdDate"]);
    assert_eq!(edited["rating"], 9.0);
}

#[test]
fn test_record_like_unlike() {
    let (app, _tmp) = setup();
    add(&app, json!({"url": "https://a.example"}));
    let liked = handle_method(&app, "record.like", &json!({"id": 1})).unwrap();
    assert_eq!(liked, json!({"id": 1, "likes": 1}));
    let unliked = handle_method(&app, "record.unlike", &json!({"id": 1})).unwrap();
    assert_eq!(unliked["likes"], 0);
    let floored = handle_method(&app, "record.unlike", &json!({"id": 1})).unwrap();
    assert_eq!(floored["likes"], 0);
}

#[test]
fn test_record_delete_and_cleanup() {
    let (app, _tmp) = setup();
    add(&app, json!({"url": "https://a.example"}));
    add(&app, json!({"url": "https://b.example"}));
    add(&app, json!({"url": "https://c.example"}));
    handle_method(&app, "record.like", &json!({"id": 3})).unwrap();

    let res = handle_method(&app, "record.delete", &json!({"id": 1})).unwrap();
    assert_eq!(res, json!({"ok": true}));

    let res = handle_method(&app, "record.cleanup", &json!({})).unwrap();
    assert_eq!(res, json!({"removed": 1}));

    let list = handle_method(&app, "record.list", &json!({})).unwrap();
    let ids: Vec<u64> = list.as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![3]);
}

// ─── Search ───

#[test]
fn test_record_search_after_rebuild() {
    let (app, _tmp) = setup();
    add(&app, json!({"url": "https://rust-lang.org", "rating": 9, "tags": "rust"}));
    add(&app, json!({"url": "https://a.example", "comment": "rust notes", "rating": 4}));
    add(&app, json!({"url": "https://b.example", "comment": "bread", "rating": 7}));

    let rebuilt = handle_method(&app, "mirror.rebuild", &json!({})).unwrap();
    assert_eq!(rebuilt, json!({"documents": 3}));

    let res = handle_method(&app, "record.search", &json!({"tag": "rust"})).unwrap();
    let arr = res.as_array().unwrap();
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], 1);

    let res = handle_method(&app, "record.search", &json!({"text": "rust"})).unwrap();
    let mut ids: Vec<u64> = res.as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);

    let res = handle_method(&app, "record.search", &json!({"rating_min": 5})).unwrap();
    let ids: Vec<u64> = res.as_array().unwrap().iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[test]
fn test_record_search_rejects_bad_date() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "record.search", &json!({"date_from": "last week"}));
    assert!(res.unwrap_err().starts_with("invalid input"));
}

#[test]
fn test_records_survive_app_restart() {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig::with_data_dir(tmp.path());
    {
        let app = Mutex::new(App::with_fetcher(config.clone(), Arc::new(StaticPageFetcher::new())).unwrap());
        add(&app, json!({"url": "https://a.example", "comment": "persisted"}));
        app.into_inner().unwrap().shutdown();
    }
    let mut app = App::with_fetcher(config, Arc::new(StaticPageFetcher::new())).unwrap();
    app.startup();
    let app = Mutex::new(app);

    let res = handle_method(&app, "record.search", &json!({"text": "persisted"})).unwrap();
    assert_eq!(res.as_array().unwrap().len(), 1);
}
