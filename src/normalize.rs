//! Row normalization for raw sheet records.
//!
//! Sheet rows arrive loosely typed: Korean column names with English aliases,
//! numbers where strings are expected, and JSON encoded inside string cells.
//! A record may also wrap a `rows` list where each sub-row is one platform
//! attempt. Flattening is an explicit validation step: sub-rows that cannot be
//! identified are reported as dropped, never defaulted.
use crate::model::{AltCaption, ContentItem, DroppedRow, Platform};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

pub const CONTENT_ID_FIELDS: &[&str] = &["콘텐츠ID", "contentId"];
pub const PLATFORM_FIELDS: &[&str] = &["플랫폼", "platform"];
pub const TITLE_FIELDS: &[&str] = &["제목", "title"];
/// Body candidates in priority order: rendered body, raw content, generic html, generic text.
pub const BODY_FIELDS: &[&str] = &["본문HTML", "내용(원문)", "html", "text"];
pub const TAG_FIELDS: &[&str] = &["태그", "tags"];
pub const STATUS_FIELDS: &[&str] = &["상태", "status"];
pub const ATTEMPT_FIELDS: &[&str] = &["시도횟수", "attempts"];
pub const IMAGE_FILES_FIELDS: &[&str] = &["이미지파일(JSON)", "images"];
pub const ALT_CAPTION_FIELDS: &[&str] = &["ALT/캡션(JSON)", "altCaptions"];
pub const EXTRA_META_FIELDS: &[&str] = &["기타메타(JSON)", "extraMeta"];
pub const IMAGE_META_FIELDS: &[&str] = &["이미지메타(JSON)", "imageMeta"];

const SUB_ROWS_FIELD: &str = "rows";

/// Flattened output of `normalize_rows`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Normalized {
    pub items: Vec<ContentItem>,
    pub dropped: Vec<DroppedRow>,
}

/// Flatten raw records (and nested sub-rows) into content items.
pub fn normalize_rows(raw: &[Value]) -> Normalized {
    let mut out = Normalized::default();
    for (index, record) in raw.iter().enumerate() {
        let Some(record) = record.as_object() else {
            out.dropped.push(DroppedRow {
                index,
                sub_index: None,
                reason: "record is not an object".to_string(),
            });
            continue;
        };

        match record.get(SUB_ROWS_FIELD) {
            Some(Value::Array(sub_rows)) => {
                for (sub_index, sub_row) in sub_rows.iter().enumerate() {
                    let Some(sub_row) = sub_row.as_object() else {
                        out.dropped.push(DroppedRow {
                            index,
                            sub_index: Some(sub_index),
                            reason: "sub-row is not an object".to_string(),
                        });
                        continue;
                    };
                    let fields = Fields {
                        row: sub_row,
                        parent: Some(record),
                    };
                    push_item(&mut out, fields, index, Some(sub_index));
                }
            }
            _ => {
                let fields = Fields {
                    row: record,
                    parent: None,
                };
                push_item(&mut out, fields, index, None);
            }
        }
    }
    out
}

fn push_item(out: &mut Normalized, fields: Fields<'_>, index: usize, sub_index: Option<usize>) {
    match fields.to_item() {
        Some(item) => out.items.push(item),
        None => {
            tracing::debug!(index, ?sub_index, "dropping row without content id");
            out.dropped.push(DroppedRow {
                index,
                sub_index,
                reason: "missing content id".to_string(),
            });
        }
    }
}

/// Field lookup over a row with an optional enclosing record to inherit from.
#[derive(Clone, Copy)]
struct Fields<'a> {
    row: &'a Map<String, Value>,
    parent: Option<&'a Map<String, Value>>,
}

impl<'a> Fields<'a> {
    fn get(&self, names: &[&str]) -> Option<&'a Value> {
        lookup(self.row, names).or_else(|| self.parent.and_then(|parent| lookup(parent, names)))
    }

    fn string(&self, names: &[&str]) -> String {
        self.get(names).and_then(coerce_string).unwrap_or_default()
    }

    fn to_item(self) -> Option<ContentItem> {
        let content_id = self.string(CONTENT_ID_FIELDS).trim().to_string();
        if content_id.is_empty() {
            return None;
        }
        let platform_label = self.string(PLATFORM_FIELDS).trim().to_string();
        Some(ContentItem {
            platform: Platform::parse(&platform_label),
            platform_label,
            title: self.string(TITLE_FIELDS),
            body: pick_body(self.row, self.parent),
            tags: parse_tags(&self.string(TAG_FIELDS)),
            status: self.string(STATUS_FIELDS),
            attempts: self.get(ATTEMPT_FIELDS).map(coerce_count).unwrap_or(0),
            image_files: parse_json_or(self.get(IMAGE_FILES_FIELDS), Vec::<String>::new()),
            alt_captions: parse_json_or(self.get(ALT_CAPTION_FIELDS), Vec::<AltCaption>::new()),
            extra_meta: parse_json_or(self.get(EXTRA_META_FIELDS), empty_object()),
            image_meta: parse_json_or(self.get(IMAGE_META_FIELDS), empty_object()),
            content_id,
        })
    }
}

/// First present, non-null value among `names`.
pub fn lookup<'a>(row: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| row.get(*name))
        .find(|value| !value.is_null())
}

/// Render scalar cells as text. Arrays and objects are not coerced.
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn coerce_count(value: &Value) -> u32 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64))
            .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
            .unwrap_or(0),
        Value::String(text) => text.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Parse a JSON-encoded cell, returning `fallback` on anything malformed.
///
/// Stores sometimes hand back the already-decoded value instead of a string;
/// that shape is accepted as long as it deserializes to `T`.
pub fn parse_json_or<T: DeserializeOwned>(raw: Option<&Value>, fallback: T) -> T {
    match raw {
        Some(Value::String(text)) if !text.trim().is_empty() => {
            serde_json::from_str(text).unwrap_or(fallback)
        }
        Some(value @ (Value::Array(_) | Value::Object(_))) => {
            serde_json::from_value(value.clone()).unwrap_or(fallback)
        }
        _ => fallback,
    }
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// First non-empty body candidate, checking the row before its parent.
pub fn pick_body(row: &Map<String, Value>, parent: Option<&Map<String, Value>>) -> String {
    let candidates = [Some(row), parent];
    for name in BODY_FIELDS {
        for source in candidates.iter().flatten() {
            if let Some(text) = source.get(*name).and_then(coerce_string) {
                if !text.trim().is_empty() {
                    return text;
                }
            }
        }
    }
    String::new()
}

/// Split a comma-separated tag cell, dropping empties and leading `#`.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|tag| tag.trim().trim_start_matches('#').trim())
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
#[path = "normalize_tests.rs"]
mod tests;
