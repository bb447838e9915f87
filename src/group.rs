//! Grouping by content id and per-item eligibility.
use crate::model::{ContentGroup, ContentItem, Platform};
use std::collections::{HashMap, HashSet};

/// Partition items by content id, keeping encounter order within and across groups.
///
/// Items with a blank id are dropped rather than merged into a shared group.
pub fn group_items(items: Vec<ContentItem>) -> Vec<ContentGroup> {
    let mut groups: Vec<ContentGroup> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for item in items {
        if item.content_id.trim().is_empty() {
            continue;
        }
        match index.get(&item.content_id) {
            Some(&slot) => groups[slot].items.push(item),
            None => {
                index.insert(item.content_id.clone(), groups.len());
                groups.push(ContentGroup {
                    content_id: item.content_id.clone(),
                    items: vec![item],
                });
            }
        }
    }
    groups
}

/// Status-based eligibility, overridden by an explicit id list.
pub fn is_status_eligible(item: &ContentItem, wanted: Option<&HashSet<String>>) -> bool {
    if let Some(wanted) = wanted {
        if wanted.contains(&item.content_id) {
            return true;
        }
    }
    let status = item.status.trim().to_lowercase();
    status.is_empty() || status == "pending"
}

/// Platform the item would publish to in this run, if it is a selected one.
///
/// A blank platform label falls back to the first selected platform. An
/// unknown label never matches.
pub fn target_platform(item: &ContentItem, selected: &[Platform]) -> Option<Platform> {
    let platform = if item.has_blank_platform() {
        selected.first().copied()
    } else {
        item.platform
    }?;
    selected.contains(&platform).then_some(platform)
}

/// Items of `group` to attempt this run, paired with their target platform.
pub fn eligible_items<'a>(
    group: &'a ContentGroup,
    selected: &[Platform],
    wanted: Option<&HashSet<String>>,
) -> Vec<(&'a ContentItem, Platform)> {
    group
        .items
        .iter()
        .filter(|item| is_status_eligible(item, wanted))
        .filter_map(|item| target_platform(item, selected).map(|platform| (item, platform)))
        .collect()
}
