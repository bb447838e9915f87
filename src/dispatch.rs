//! The publish loop.
//!
//! Groups are processed one at a time in store order, and items within a group
//! one at a time; a publish never starts before the previous one settled. The
//! `limit` option caps attempted publish actions across the whole run. Once it
//! is reached, remaining groups are still reported (empty, `done`) but nothing
//! more is attempted or written back. Every processed group is written back,
//! dry-run included.
//!
//! A group publishes at most once per platform. Later rows resolving to an
//! already attempted platform are listed under `skipped` instead.
//!
//! Only precondition and store-fetch failures abort a run. Publisher and
//! write-back failures are recorded in the report and the loop moves on.
use crate::config::Config;
use crate::error::RunError;
use crate::group::{eligible_items, group_items};
use crate::model::{
    ContentItem, GroupReport, GroupStatus, Platform, PlatformResult, RunOptions, RunReport,
    SkippedItem, WriteBackOutcome,
};
use crate::normalize::normalize_rows;
use crate::publish::{PublisherRegistry, UploadInput};
use crate::render::{render, resolve_media_paths};
use crate::report::ReportBuilder;
use crate::store::{store_from_config, ContentStore, WriteBack};
use std::collections::{BTreeMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

/// Attempt counter increment written back for every processed group.
pub const ATTEMPTS_DELTA: u32 = 1;

/// Run the workflow against the store and publishers described by `config`.
pub fn run_workflow(
    config: &Config,
    selected: &[Platform],
    options: RunOptions,
) -> Result<RunReport, RunError> {
    check_preconditions(selected, &options)?;
    let store_config = config
        .validate_store()
        .map_err(|err| RunError::precondition(format!("{err:#}")))?;
    let mut store = store_from_config(store_config);
    let mut publishers = if options.dry_run {
        PublisherRegistry::new()
    } else {
        PublisherRegistry::from_config(config, selected)
    };
    run_with(config, selected, options, store.as_mut(), &mut publishers)
}

/// Run the workflow with caller-supplied store and publishers.
pub fn run_with(
    config: &Config,
    selected: &[Platform],
    mut options: RunOptions,
    store: &mut dyn ContentStore,
    publishers: &mut PublisherRegistry,
) -> Result<RunReport, RunError> {
    check_preconditions(selected, &options)?;
    tracing::info!(
        platforms = ?selected,
        dry_run = options.dry_run,
        limit = ?options.limit,
        "run started"
    );

    let raw_rows = match options.rows.take() {
        Some(rows) => {
            tracing::debug!(rows = rows.len(), "using pre-supplied rows");
            rows
        }
        None => store.fetch().map_err(RunError::StoreFetch)?,
    };
    let normalized = normalize_rows(&raw_rows);
    if !normalized.dropped.is_empty() {
        tracing::warn!(
            dropped = normalized.dropped.len(),
            "dropped rows without a content id"
        );
    }
    let groups = group_items(normalized.items);
    let wanted: Option<HashSet<String>> = options
        .content_ids
        .as_ref()
        .map(|ids| ids.iter().map(|id| id.trim().to_string()).collect());
    let image_root = config.image_root();
    let pause = config.publish_pause().filter(|_| !options.dry_run);

    let mut report = ReportBuilder::new(selected, &options);
    report.set_dropped_rows(normalized.dropped);

    for group in &groups {
        if report.limit_reached() {
            report.push_group(GroupReport {
                content_id: group.content_id.clone(),
                results: BTreeMap::new(),
                skipped: Vec::new(),
                status: GroupStatus::Done,
                write_back: WriteBackOutcome::skipped("limit reached"),
            });
            continue;
        }

        let first = report.total_tried();
        let mut results = BTreeMap::new();
        let mut skipped = Vec::new();
        for (item, platform) in eligible_items(group, selected, wanted.as_ref()) {
            if report.limit_reached() {
                break;
            }
            if results.contains_key(&platform) {
                tracing::warn!(
                    content_id = %item.content_id,
                    %platform,
                    "duplicate platform row skipped"
                );
                skipped.push(SkippedItem::duplicate(item, platform));
                continue;
            }
            let result = attempt(item, platform, &image_root, options.dry_run, publishers)
                .for_attempt(&item.content_id, platform);
            results.insert(platform, result.clone());
            report.record_result(result);
            if let Some(pause) = pause {
                std::thread::sleep(pause);
            }
        }
        let status = GroupStatus::from_results(report.results_since(first));

        let write_back = write_back(store, &group.content_id, &results, status);
        tracing::debug!(
            content_id = %group.content_id,
            attempted = results.len(),
            %status,
            "group finished"
        );
        report.push_group(GroupReport {
            content_id: group.content_id.clone(),
            results,
            skipped,
            status,
            write_back,
        });
    }

    let report = report.finish();
    tracing::info!(
        total_tried = report.total_tried,
        failed = report.failed_count(),
        groups = report.per_content.len(),
        "run finished"
    );
    Ok(report)
}

fn check_preconditions(selected: &[Platform], options: &RunOptions) -> Result<(), RunError> {
    if selected.is_empty() {
        return Err(RunError::precondition("at least one platform must be selected"));
    }
    if options.limit == Some(0) {
        return Err(RunError::precondition("limit must be a positive integer"));
    }
    Ok(())
}

/// Render one item and publish it (or simulate publishing in dry-run mode).
fn attempt(
    item: &ContentItem,
    platform: Platform,
    image_root: &Path,
    dry_run: bool,
    publishers: &mut PublisherRegistry,
) -> PlatformResult {
    let media_paths = resolve_media_paths(image_root, &item.image_files);
    let rendered = render(&item.body, &media_paths);

    if dry_run {
        tracing::info!(
            content_id = %item.content_id,
            %platform,
            images_used = rendered.used_paths.len(),
            "dry-run publish"
        );
        return PlatformResult {
            id: Some(item.content_id.clone()),
            ..PlatformResult::success(format!("dry-run://{}/{}", item.content_id, platform))
        };
    }

    let input = UploadInput {
        item,
        rendered_body: &rendered.body,
        media_paths: &media_paths,
    };
    // Publishers wrap external automation; a panic there must not end the run.
    let outcome = catch_unwind(AssertUnwindSafe(|| publishers.publish(platform, &input)));
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => PlatformResult::failure(format!("{err:#}")),
        Err(panic) => PlatformResult::failure(panic_message(panic.as_ref())),
    };
    if result.ok {
        tracing::info!(
            content_id = %item.content_id,
            %platform,
            url = result.url.as_deref().unwrap_or(""),
            "publish ok"
        );
    } else {
        tracing::warn!(
            content_id = %item.content_id,
            %platform,
            error = result.error.as_deref().unwrap_or(""),
            "publish failed"
        );
    }
    result
}

fn write_back(
    store: &mut dyn ContentStore,
    content_id: &str,
    results: &BTreeMap<Platform, PlatformResult>,
    status: GroupStatus,
) -> WriteBackOutcome {
    let update = WriteBack {
        content_id,
        results,
        status,
        attempts_delta: ATTEMPTS_DELTA,
    };
    match store.write_back(&update) {
        Ok(ack) => WriteBackOutcome::Written { ack },
        Err(err) => {
            tracing::warn!(content_id, error = %format!("{err:#}"), "write-back failed");
            WriteBackOutcome::Failed {
                error: format!("{err:#}"),
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|text| text.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("publisher panicked: {detail}")
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
