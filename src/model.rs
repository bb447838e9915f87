//! Shared types for normalized content, per-platform outcomes, and run reports.
//!
//! Report types serialize with camelCase keys so adapters can forward them
//! unchanged to the console and tool callers that consume the JSON.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Publishing targets known to the workflow.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    NaverBlog,
    Tistory,
    Cafe24Blog,
    SonaverseBlog,
    Threads,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Platform::NaverBlog,
        Platform::Tistory,
        Platform::Cafe24Blog,
        Platform::SonaverseBlog,
        Platform::Threads,
    ];

    /// Return the stable tag used in sheets, URLs, and JSON artifacts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::NaverBlog => "naver_blog",
            Platform::Tistory => "tistory",
            Platform::Cafe24Blog => "cafe24_blog",
            Platform::SonaverseBlog => "sonaverse_blog",
            Platform::Threads => "threads",
        }
    }

    /// Parse a tag, ignoring surrounding whitespace. Unknown tags yield `None`.
    pub fn parse(tag: &str) -> Option<Platform> {
        let tag = tag.trim();
        Platform::ALL
            .into_iter()
            .find(|platform| platform.as_str() == tag)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the alt/caption JSON column.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AltCaption {
    #[serde(default)]
    pub idx: u32,
    #[serde(default)]
    pub alt: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub rel_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
}

/// Canonical, read-only representation of one platform-targeted row.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub content_id: String,
    /// Parsed platform tag; `None` when the label is blank or unknown.
    pub platform: Option<Platform>,
    /// Trimmed platform label as found in the row.
    pub platform_label: String,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
    pub status: String,
    pub attempts: u32,
    /// Media paths relative to the configured image root, in placeholder order.
    pub image_files: Vec<String>,
    pub alt_captions: Vec<AltCaption>,
    pub extra_meta: Value,
    pub image_meta: Value,
}

impl ContentItem {
    /// True when the row carried no platform label at all.
    pub fn has_blank_platform(&self) -> bool {
        self.platform_label.is_empty()
    }
}

/// All items sharing one content identifier, in encounter order.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentGroup {
    pub content_id: String,
    pub items: Vec<ContentItem>,
}

/// Outcome of one publish attempt (real or simulated).
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_ref: Option<String>,
}

impl PlatformResult {
    pub fn success(url: impl Into<String>) -> Self {
        PlatformResult {
            ok: true,
            url: Some(url.into()),
            ..PlatformResult::default()
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        PlatformResult {
            ok: false,
            error: Some(error.into()),
            ..PlatformResult::default()
        }
    }

    /// Stamp the attempt coordinates so flat result lists stay self-describing.
    pub fn for_attempt(mut self, content_id: &str, platform: Platform) -> Self {
        self.platform = Some(platform);
        self.content_id = Some(content_id.to_string());
        self
    }
}

/// Aggregate status of one content group after a run.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GroupStatus {
    Done,
    Error,
}

impl GroupStatus {
    /// `Error` iff any attempted result failed; vacuously `Done`.
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a PlatformResult>) -> Self {
        if results.into_iter().any(|result| !result.ok) {
            GroupStatus::Error
        } else {
            GroupStatus::Done
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupStatus::Done => "done",
            GroupStatus::Error => "error",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened when the group outcome was written back to the store.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteBackOutcome {
    Written { ack: Value },
    Failed { error: String },
    Skipped { reason: String },
}

impl WriteBackOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        WriteBackOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, WriteBackOutcome::Failed { .. })
    }
}

/// An eligible item that was not attempted.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SkippedItem {
    pub platform: Platform,
    /// Platform label as found in the row (blank for fallback rows).
    pub platform_label: String,
    pub reason: String,
}

impl SkippedItem {
    /// A second row of the group targeting a platform already attempted.
    pub fn duplicate(item: &ContentItem, platform: Platform) -> Self {
        SkippedItem {
            platform,
            platform_label: item.platform_label.clone(),
            reason: format!("duplicate row for {platform}"),
        }
    }
}

/// Per content-id section of the run report.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GroupReport {
    pub content_id: String,
    pub results: BTreeMap<Platform, PlatformResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedItem>,
    pub status: GroupStatus,
    pub write_back: WriteBackOutcome,
}

/// Invocation options supplied by the outer adapter.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunOptions {
    #[serde(default)]
    pub dry_run: bool,
    /// Cap on attempted publish actions across the whole run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Ids that bypass status-based eligibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ids: Option<Vec<String>>,
    /// Pre-supplied raw rows; when present the store is not fetched.
    #[serde(default, skip_serializing)]
    pub rows: Option<Vec<Value>>,
}

/// A raw record (or nested sub-row) that could not become a `ContentItem`.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRow {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_index: Option<usize>,
    pub reason: String,
}

/// Sole return value of a run.
#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// The run completed; individual entries may still have failed.
    pub ok: bool,
    pub dry_run: bool,
    pub limit: Option<usize>,
    pub selected_platforms: Vec<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ids: Option<Vec<String>>,
    pub total_tried: usize,
    pub per_content: Vec<GroupReport>,
    pub results_flat: Vec<PlatformResult>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped_rows: Vec<DroppedRow>,
}

impl RunReport {
    pub fn failed_count(&self) -> usize {
        self.results_flat.iter().filter(|result| !result.ok).count()
    }

    pub fn group(&self, content_id: &str) -> Option<&GroupReport> {
        self.per_content
            .iter()
            .find(|group| group.content_id == content_id)
    }
}
