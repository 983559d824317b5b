//! RPC method handler for the linkshelf JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! The `handle_method` function dispatches JSON-RPC method calls to the
//! catalog via the `App` struct.

use std::sync::Mutex;

use crate::app::App;
use crate::managers::catalog_manager::CatalogManagerTrait;
use crate::types::errors::StoreError;
use crate::types::record::{render_stars, Record, RecordInput};
use crate::types::search::SearchCriteria;

use serde_json::{json, Value};

/// Maps a store error to the message shown to clients. Storage failures are
/// reported generically and logged in full.
fn store_error(e: StoreError) -> String {
    if matches!(e, StoreError::Io(_) | StoreError::Serialization(_) | StoreError::Lock(_)) {
        tracing::error!(error = %e, "storage operation failed");
    }
    e.user_message()
}

fn param_id(params: &Value) -> Result<u64, String> {
    params.get("id").and_then(|v| v.as_u64()).ok_or_else(|| "missing id".to_string())
}

fn param_str(params: &Value, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

/// Rating as a number or a numeric string; blank or absent means "use the
/// default".
fn param_rating(params: &Value) -> Result<Option<f64>, String> {
    match params.get("rating") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| format!("invalid input: rating {:?} is not a number", s)),
        Some(_) => Err("invalid input: rating must be a number".to_string()),
    }
}

/// Tags as the comma-separated string users type, or an array of strings.
fn param_tags(params: &Value) -> String {
    match params.get("tags") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(","),
        _ => String::new(),
    }
}

fn record_input(params: &Value) -> Result<RecordInput, String> {
    Ok(RecordInput {
        url: param_str(params, "url").unwrap_or_default(),
        comment: param_str(params, "comment").unwrap_or_default(),
        rating: param_rating(params)?,
        tags: param_tags(params),
        author: param_str(params, "author"),
    })
}

fn record_json(record: &Record, scale: f64) -> Result<Value, String> {
    let mut value = serde_json::to_value(record).map_err(|e| e.to_string())?;
    if let Value::Object(map) = &mut value {
        map.insert("stars".to_string(), json!(render_stars(record.rating, scale)));
    }
    Ok(value)
}

fn records_json(records: &[Record], scale: f64) -> Result<Value, String> {
    let arr = records
        .iter()
        .map(|r| record_json(r, scale))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(arr))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        // ─── Records ───
        "record.add" => {
            let input = record_input(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let page = a.fetch_page(&input.url);
            let record = a.catalog.add(&input, page).map_err(store_error)?;
            record_json(&record, a.config.rating_scale)
        }
        "record.edit" => {
            let id = param_id(params)?;
            let input = record_input(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            // A missing id must not trigger a page fetch.
            a.catalog.get(id).map_err(store_error)?;
            let page = a.fetch_page(&input.url);
            let record = a.catalog.edit(id, &input, page).map_err(store_error)?;
            record_json(&record, a.config.rating_scale)
        }
        "record.get" => {
            let id = param_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let record = a.catalog.get(id).map_err(store_error)?;
            record_json(&record, a.config.rating_scale)
        }
        "record.list" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let records = a.catalog.list().map_err(store_error)?;
            records_json(&records, a.config.rating_scale)
        }
        "record.like" => {
            let id = param_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let likes = a.catalog.like(id).map_err(store_error)?;
            Ok(json!({"id": id, "likes": likes}))
        }
        "record.unlike" => {
            let id = param_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let likes = a.catalog.unlike(id).map_err(store_error)?;
            Ok(json!({"id": id, "likes": likes}))
        }
        "record.delete" => {
            let id = param_id(params)?;
            let a = app.lock().map_err(|e| e.to_string())?;
            a.catalog.delete(id).map_err(store_error)?;
            Ok(json!({"ok": true}))
        }
        "record.cleanup" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let removed = a.catalog.remove_unliked().map_err(store_error)?;
            Ok(json!({"removed": removed}))
        }
        "record.search" => {
            let criteria: SearchCriteria = serde_json::from_value(params.clone())
                .map_err(|e| format!("invalid input: {}", e))?;
            let a = app.lock().map_err(|e| e.to_string())?;
            let records = a.catalog.search(&criteria).map_err(store_error)?;
            records_json(&records, a.config.rating_scale)
        }

        // ─── Search mirror ───
        "mirror.rebuild" => {
            let a = app.lock().map_err(|e| e.to_string())?;
            let documents = a.catalog.rebuild_mirror().map_err(store_error)?;
            Ok(json!({"documents": documents}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
