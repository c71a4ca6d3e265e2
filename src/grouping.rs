// src/grouping.rs

//! Partitioning item batches into named buckets.

use std::collections::BTreeMap;

use tracing::debug;

use crate::errors::{Result, TagflowError};
use crate::filter::{Filter, FilterTarget, apply_filter};
use crate::item::{Taggable, TaggedItem, unique_items};

/// Buckets keyed by the filter that selects them, in key order.
pub type Groups = BTreeMap<Filter, Vec<TaggedItem>>;

/// Partition `items` according to `filter`.
///
/// - `filter.value()` set: a single bucket keyed by `filter` itself, holding
///   every matching item.
/// - `filter.value()` unset: one bucket per distinct value of the tag
///   `filter` names. Each key is `filter` pinned to that value with the `Or`
///   operator. Items without the tag land in no bucket.
///
/// Dynamic grouping on an attribute is rejected with
/// [`TagflowError::UnsupportedGrouping`].
pub fn group_by(items: &[TaggedItem], filter: &Filter) -> Result<Groups> {
    let mut groups = Groups::new();

    if !filter.is_grouping() {
        groups.insert(filter.clone(), apply_filter(filter, items));
        return Ok(groups);
    }

    let name = match filter.target() {
        FilterTarget::Tag(name) => name,
        FilterTarget::Attribute(kind) => {
            return Err(TagflowError::UnsupportedGrouping(format!(
                "cannot group by every value of attribute '{kind}'"
            )));
        }
    };

    let mut by_value: BTreeMap<&str, Vec<&TaggedItem>> = BTreeMap::new();
    for item in items {
        let mut values: Vec<&str> = item.tag_values(name).collect();
        values.sort_unstable();
        values.dedup();
        for value in values {
            by_value.entry(value).or_default().push(item);
        }
    }

    for (value, bucket) in by_value {
        groups.insert(filter.pinned_to(value), unique_items(bucket));
    }

    debug!(
        filter = %filter,
        items = items.len(),
        groups = groups.len(),
        "grouped items"
    );

    Ok(groups)
}

/// Reject filters that [`group_by`] cannot handle, before any item is seen.
pub fn ensure_groupable(filter: &Filter) -> Result<()> {
    if filter.is_grouping() {
        if let FilterTarget::Attribute(kind) = filter.target() {
            return Err(TagflowError::UnsupportedGrouping(format!(
                "cannot group by every value of attribute '{kind}'"
            )));
        }
    }
    Ok(())
}
