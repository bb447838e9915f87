//! Content store access: fetching raw rows and writing run outcomes back.
//!
//! Two backends exist. `SheetsStore` talks to a spreadsheet web app over HTTP;
//! `FileStore` reads and rewrites a local JSON array so runs can be repeated
//! offline with the same skip-completed behavior.
use crate::config::StoreConfig;
use crate::model::{GroupStatus, Platform, PlatformResult};
use crate::normalize::{
    coerce_string, lookup, ATTEMPT_FIELDS, CONTENT_ID_FIELDS, PLATFORM_FIELDS, STATUS_FIELDS,
};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Column that receives per-platform outcome JSON in file-backed sheets.
pub const RESULT_FIELD: &str = "발행결과(JSON)";

/// Outcome of one content group, as persisted by the store.
#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct WriteBack<'a> {
    pub content_id: &'a str,
    pub results: &'a BTreeMap<Platform, PlatformResult>,
    pub status: GroupStatus,
    pub attempts_delta: u32,
}

/// Tabular content store consumed by the workflow.
pub trait ContentStore {
    /// Raw records, each possibly nesting `rows`.
    fn fetch(&mut self) -> Result<Vec<Value>>;

    /// Persist one group's outcome and return the store's acknowledgement.
    fn write_back(&mut self, update: &WriteBack<'_>) -> Result<Value>;
}

/// Build the store described by the config.
pub fn store_from_config(config: &StoreConfig) -> Box<dyn ContentStore> {
    match config {
        StoreConfig::Sheets { web_app_url, token } => {
            Box::new(SheetsStore::new(web_app_url.clone(), token.clone()))
        }
        StoreConfig::File { path } => Box::new(FileStore::new(path.clone())),
    }
}

/// Spreadsheet web app endpoint.
///
/// Rows come from `GET ?mode=rows&token=…`; outcomes are `POST`ed as JSON with
/// the token in the body.
#[derive(Debug, Clone)]
pub struct SheetsStore {
    web_app_url: String,
    token: String,
}

impl SheetsStore {
    pub fn new(web_app_url: String, token: String) -> Self {
        SheetsStore { web_app_url, token }
    }
}

impl ContentStore for SheetsStore {
    fn fetch(&mut self) -> Result<Vec<Value>> {
        let start = Instant::now();
        let mut response = ureq::get(&self.web_app_url)
            .query("mode", "rows")
            .query("token", &self.token)
            .call()
            .context("request rows from sheets web app")?;
        let payload: Value = response
            .body_mut()
            .read_json()
            .context("decode sheets rows response")?;
        let rows = rows_from_payload(payload)?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            rows = rows.len(),
            "sheets rows fetched"
        );
        Ok(rows)
    }

    fn write_back(&mut self, update: &WriteBack<'_>) -> Result<Value> {
        let body = json!({
            "token": self.token,
            "mode": "writeBack",
            "contentId": update.content_id,
            "status": update.status,
            "attemptsDelta": update.attempts_delta,
            "results": update.results,
        });
        let mut response = ureq::post(&self.web_app_url)
            .send_json(&body)
            .with_context(|| format!("post write-back for {}", update.content_id))?;
        let ack: Value = response
            .body_mut()
            .read_json()
            .context("decode write-back response")?;
        check_ack(ack)
    }
}

/// Accept `{ok: true, list: [...]}` or a bare array.
pub fn rows_from_payload(payload: Value) -> Result<Vec<Value>> {
    match payload {
        Value::Array(rows) => Ok(rows),
        Value::Object(mut map) => {
            if map.get("ok").and_then(Value::as_bool) == Some(false) {
                return Err(anyhow!("sheets web app error: {}", error_text(&map)));
            }
            match map.remove("list").or_else(|| map.remove("rows")) {
                Some(Value::Array(rows)) => Ok(rows),
                _ => Err(anyhow!("sheets response has no row list")),
            }
        }
        other => Err(anyhow!("unexpected sheets response: {other}")),
    }
}

fn check_ack(ack: Value) -> Result<Value> {
    if let Some(map) = ack.as_object() {
        if map.get("ok").and_then(Value::as_bool) == Some(false) {
            return Err(anyhow!("write-back rejected: {}", error_text(map)));
        }
    }
    Ok(ack)
}

fn error_text(map: &Map<String, Value>) -> String {
    map.get("error")
        .and_then(coerce_string)
        .unwrap_or_else(|| "unknown error".to_string())
}

/// Local JSON sheet.
///
/// Write-back marks each row of the content id whose platform has a result as
/// `done` or `error`, bumps its attempt counter, and records the result JSON.
/// Rows for platforms that were not attempted are left untouched.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        FileStore { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_rows(&self) -> Result<Vec<Value>> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read sheet {}", self.path.display()))?;
        let data: Value = serde_json::from_str(&text)
            .with_context(|| format!("parse sheet JSON {}", self.path.display()))?;
        match data {
            Value::Array(rows) => Ok(rows),
            _ => Err(anyhow!(
                "sheet JSON is not an array ({})",
                self.path.display()
            )),
        }
    }

    fn write_rows(&self, rows: &[Value]) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let text = serde_json::to_string_pretty(rows).context("serialize sheet rows")?;
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("create temp file in {}", dir.display()))?;
        tmp.write_all(text.as_bytes()).context("write sheet rows")?;
        tmp.persist(&self.path)
            .with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }
}

impl ContentStore for FileStore {
    fn fetch(&mut self) -> Result<Vec<Value>> {
        self.read_rows()
    }

    fn write_back(&mut self, update: &WriteBack<'_>) -> Result<Value> {
        let mut rows = self.read_rows()?;
        let mut updated = 0usize;
        for record in rows.iter_mut() {
            let Some(record) = record.as_object_mut() else {
                continue;
            };
            let inherited_id = lookup(record, CONTENT_ID_FIELDS).and_then(coerce_string);
            let inherited_platform = lookup(record, PLATFORM_FIELDS).and_then(coerce_string);
            match record.get_mut("rows") {
                Some(Value::Array(sub_rows)) => {
                    for sub_row in sub_rows.iter_mut().filter_map(Value::as_object_mut) {
                        if apply_update(
                            sub_row,
                            inherited_id.as_deref(),
                            inherited_platform.as_deref(),
                            update,
                        ) {
                            updated += 1;
                        }
                    }
                }
                _ => {
                    if apply_update(record, None, None, update) {
                        updated += 1;
                    }
                }
            }
        }
        if updated > 0 {
            self.write_rows(&rows)?;
        }
        Ok(json!({ "ok": true, "updated": updated }))
    }
}

fn apply_update(
    row: &mut Map<String, Value>,
    inherited_id: Option<&str>,
    inherited_platform: Option<&str>,
    update: &WriteBack<'_>,
) -> bool {
    let id = lookup(row, CONTENT_ID_FIELDS)
        .and_then(coerce_string)
        .or_else(|| inherited_id.map(str::to_string));
    if id.as_deref().map(str::trim) != Some(update.content_id) {
        return false;
    }
    let label = lookup(row, PLATFORM_FIELDS)
        .and_then(coerce_string)
        .or_else(|| inherited_platform.map(str::to_string))
        .unwrap_or_default();
    let Some(result) = Platform::parse(&label).and_then(|platform| update.results.get(&platform))
    else {
        return false;
    };

    let status = if result.ok { "done" } else { "error" };
    let attempts = lookup(row, ATTEMPT_FIELDS)
        .and_then(coerce_string)
        .and_then(|text| text.trim().parse::<u64>().ok())
        .unwrap_or(0)
        + u64::from(update.attempts_delta);
    row.insert(STATUS_FIELDS[0].to_string(), json!(status));
    row.insert(ATTEMPT_FIELDS[0].to_string(), json!(attempts));
    row.insert(
        RESULT_FIELD.to_string(),
        json!(serde_json::to_string(result).unwrap_or_default()),
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_payload_shapes() {
        let rows = rows_from_payload(json!({"ok": true, "list": [{"a": 1}]})).expect("list");
        assert_eq!(rows.len(), 1);
        let rows = rows_from_payload(json!([{"a": 1}, {"b": 2}])).expect("bare array");
        assert_eq!(rows.len(), 2);
        let err = rows_from_payload(json!({"ok": false, "error": "bad token"})).expect_err("error");
        assert!(err.to_string().contains("bad token"));
        assert!(rows_from_payload(json!({"ok": true})).is_err());
        assert!(rows_from_payload(json!("nope")).is_err());
    }

    #[test]
    fn rejected_ack_is_an_error() {
        assert!(check_ack(json!({"ok": false, "error": "locked"})).is_err());
        assert!(check_ack(json!({"ok": true})).is_ok());
        assert!(check_ack(json!("fine")).is_ok());
    }

    #[test]
    fn file_store_rejects_non_array_sheet() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rows.json");
        fs::write(&path, r#"{"not": "rows"}"#).expect("write sheet");
        let mut store = FileStore::new(path);
        let err = store.fetch().expect_err("object sheet rejected");
        assert!(err.to_string().contains("not an array"));
    }

    #[test]
    fn file_store_write_back_updates_attempted_platforms_only() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rows.json");
        let sheet = json!([
            {"콘텐츠ID": "A", "플랫폼": "naver_blog", "상태": "pending", "시도횟수": "1"},
            {"콘텐츠ID": "A", "플랫폼": "tistory", "상태": "pending"},
            {"콘텐츠ID": "G", "rows": [
                {"플랫폼": "threads", "상태": ""},
                {"플랫폼": "naver_blog"}
            ]},
            {"콘텐츠ID": "B", "플랫폼": "naver_blog", "상태": "pending"}
        ]);
        fs::write(&path, sheet.to_string()).expect("write sheet");
        let mut store = FileStore::new(path.clone());

        let mut results = BTreeMap::new();
        results.insert(Platform::NaverBlog, PlatformResult::success("https://blog/1"));
        let ack = store
            .write_back(&WriteBack {
                content_id: "A",
                results: &results,
                status: GroupStatus::Done,
                attempts_delta: 1,
            })
            .expect("write back A");
        assert_eq!(ack["updated"], json!(1));

        let mut results = BTreeMap::new();
        results.insert(Platform::Threads, PlatformResult::failure("timeout"));
        store
            .write_back(&WriteBack {
                content_id: "G",
                results: &results,
                status: GroupStatus::Error,
                attempts_delta: 1,
            })
            .expect("write back G");

        let rows = store.fetch().expect("reload sheet");
        assert_eq!(rows[0]["상태"], json!("done"));
        assert_eq!(rows[0]["시도횟수"], json!(2));
        assert!(rows[0][RESULT_FIELD]
            .as_str()
            .expect("result json")
            .contains("https://blog/1"));
        assert_eq!(rows[1]["상태"], json!("pending"));
        assert_eq!(rows[2]["rows"][0]["상태"], json!("error"));
        assert_eq!(rows[2]["rows"][0]["시도횟수"], json!(1));
        assert!(rows[2]["rows"][1].get("상태").is_none());
        assert_eq!(rows[3]["상태"], json!("pending"));
    }

    #[test]
    fn file_store_write_back_without_matches_leaves_file_alone() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("rows.json");
        fs::write(&path, "[]").expect("write sheet");
        let mut store = FileStore::new(path.clone());
        let results = BTreeMap::new();
        let ack = store
            .write_back(&WriteBack {
                content_id: "missing",
                results: &results,
                status: GroupStatus::Done,
                attempts_delta: 1,
            })
            .expect("write back");
        assert_eq!(ack["updated"], json!(0));
        assert_eq!(fs::read_to_string(&path).expect("read sheet"), "[]");
    }
}
