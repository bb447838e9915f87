//! Run report assembly.
use crate::model::{DroppedRow, GroupReport, Platform, PlatformResult, RunOptions, RunReport};

/// Accumulates per-item results and per-group reports in execution order.
#[derive(Debug)]
pub struct ReportBuilder {
    dry_run: bool,
    limit: Option<usize>,
    selected_platforms: Vec<Platform>,
    content_ids: Option<Vec<String>>,
    results_flat: Vec<PlatformResult>,
    per_content: Vec<GroupReport>,
    dropped_rows: Vec<DroppedRow>,
}

impl ReportBuilder {
    pub fn new(selected: &[Platform], options: &RunOptions) -> Self {
        ReportBuilder {
            dry_run: options.dry_run,
            limit: options.limit,
            selected_platforms: selected.to_vec(),
            content_ids: options.content_ids.clone(),
            results_flat: Vec::new(),
            per_content: Vec::new(),
            dropped_rows: Vec::new(),
        }
    }

    /// Number of publish actions attempted so far.
    pub fn total_tried(&self) -> usize {
        self.results_flat.len()
    }

    pub fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.total_tried() >= limit)
    }

    /// Results recorded since the run had tried `start` actions.
    pub fn results_since(&self, start: usize) -> &[PlatformResult] {
        self.results_flat.get(start..).unwrap_or_default()
    }

    pub fn record_result(&mut self, result: PlatformResult) {
        self.results_flat.push(result);
    }

    pub fn push_group(&mut self, group: GroupReport) {
        self.per_content.push(group);
    }

    pub fn set_dropped_rows(&mut self, dropped: Vec<DroppedRow>) {
        self.dropped_rows = dropped;
    }

    pub fn finish(self) -> RunReport {
        RunReport {
            ok: true,
            dry_run: self.dry_run,
            limit: self.limit,
            selected_platforms: self.selected_platforms,
            content_ids: self.content_ids,
            total_tried: self.results_flat.len(),
            per_content: self.per_content,
            results_flat: self.results_flat,
            dropped_rows: self.dropped_rows,
        }
    }
}
