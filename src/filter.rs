// src/filter.rs

//! Predicates over tagged items.
//!
//! A [`Filter`] is used in two ways:
//! - with a `value`, it is a predicate ("does this item satisfy the condition")
//! - without a `value`, it is a grouping specification ("bucket items by every
//!   distinct value of this tag"), see [`crate::grouping`].
//!
//! Filters are also used as map keys (grouping buckets, execution keys). Every
//! filter instance carries a unique [`FilterId`], but equality, ordering and
//! hashing only look at the canonical [`FilterKey`], so two independently
//! built filters describing the same predicate always collide.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::item::{AttributeKind, Taggable, TaggedItem};

static NEXT_FILTER_ID: AtomicU64 = AtomicU64::new(1);

/// Instance identity of a filter. Never part of equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterId(u64);

impl FilterId {
    fn next() -> Self {
        FilterId(NEXT_FILTER_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// What a filter looks at: a named tag or a fixed attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterTarget {
    Tag(String),
    Attribute(AttributeKind),
}

impl fmt::Display for FilterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterTarget::Tag(name) => write!(f, "tag:{name}"),
            FilterTarget::Attribute(kind) => write!(f, "attr:{kind}"),
        }
    }
}

/// How a filter combines with the other filters of the same list.
///
/// `And` and `None` filters must all pass; if any `Or` filters are present, at
/// least one of them must pass as well.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum LogicalOperator {
    And,
    Or,
    #[default]
    None,
}

/// Canonical, comparable form of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    pub target: FilterTarget,
    /// `None` means "group by every distinct value" rather than "match".
    pub value: Option<String>,
    pub is_case_sensitive: bool,
    pub is_exactly: bool,
    pub operator: LogicalOperator,
}

/// A predicate (or grouping spec) plus its instance identity.
///
/// The canonical key is built once and only replaced by the builder methods,
/// so comparisons never allocate.
#[derive(Debug, Clone)]
pub struct Filter {
    id: FilterId,
    key: FilterKey,
}

impl Filter {
    fn new(target: FilterTarget) -> Self {
        Self {
            id: FilterId::next(),
            key: FilterKey {
                target,
                value: None,
                is_case_sensitive: true,
                is_exactly: true,
                operator: LogicalOperator::None,
            },
        }
    }

    /// Filter on the tag called `name`.
    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(FilterTarget::Tag(name.into()))
    }

    /// Filter on a fixed item attribute.
    pub fn attribute(kind: AttributeKind) -> Self {
        Self::new(FilterTarget::Attribute(kind))
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.key.value = Some(value.into());
        self
    }

    pub fn exactly(mut self, is_exactly: bool) -> Self {
        self.key.is_exactly = is_exactly;
        self
    }

    pub fn case_sensitive(mut self, is_case_sensitive: bool) -> Self {
        self.key.is_case_sensitive = is_case_sensitive;
        self
    }

    pub fn operator(mut self, operator: LogicalOperator) -> Self {
        self.key.operator = operator;
        self
    }

    pub fn id(&self) -> FilterId {
        self.id
    }

    pub fn key(&self) -> &FilterKey {
        &self.key
    }

    pub fn target(&self) -> &FilterTarget {
        &self.key.target
    }

    pub fn value(&self) -> Option<&str> {
        self.key.value.as_deref()
    }

    pub fn logical_operator(&self) -> LogicalOperator {
        self.key.operator
    }

    /// True when this filter partitions rather than selects.
    pub fn is_grouping(&self) -> bool {
        self.key.value.is_none()
    }

    /// Copy of this filter pinned to one concrete value, used as a grouping
    /// bucket key.
    pub fn pinned_to(&self, value: &str) -> Filter {
        Filter {
            id: FilterId::next(),
            key: FilterKey {
                target: self.key.target.clone(),
                value: Some(value.to_string()),
                is_case_sensitive: self.key.is_case_sensitive,
                is_exactly: self.key.is_exactly,
                operator: LogicalOperator::Or,
            },
        }
    }

    pub fn matches<T: Taggable + ?Sized>(&self, item: &T) -> bool {
        match &self.key.target {
            FilterTarget::Tag(name) => {
                let mut values = item.tag_values(name).peekable();
                match &self.key.value {
                    None => values.peek().is_some(),
                    Some(expected) => values.any(|v| self.compare(v, expected)),
                }
            }
            FilterTarget::Attribute(kind) => match (item.attribute(*kind), &self.key.value) {
                (None, _) => false,
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => self.compare(actual, expected),
            },
        }
    }

    fn compare(&self, actual: &str, expected: &str) -> bool {
        match (self.key.is_case_sensitive, self.key.is_exactly) {
            (true, true) => actual == expected,
            (true, false) => actual.contains(expected),
            (false, true) => actual.to_lowercase() == expected.to_lowercase(),
            (false, false) => actual.to_lowercase().contains(&expected.to_lowercase()),
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Filter {}

impl Hash for Filter {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl PartialOrd for Filter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Filter {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key.value {
            Some(v) => write!(f, "{}={}", self.key.target, v),
            None => write!(f, "{}=*", self.key.target),
        }
    }
}

/// Whether `item` passes a list of filters. An empty list passes everything.
pub fn passes<T: Taggable + ?Sized>(filters: &[Filter], item: &T) -> bool {
    let mut any_or = false;
    let mut or_matched = false;

    for filter in filters {
        let hit = filter.matches(item);
        match filter.key.operator {
            LogicalOperator::Or => {
                any_or = true;
                or_matched |= hit;
            }
            LogicalOperator::And | LogicalOperator::None => {
                if !hit {
                    return false;
                }
            }
        }
    }

    !any_or || or_matched
}

/// Keep the items that pass `filters`, preserving order.
pub fn apply_filters(filters: &[Filter], items: &[TaggedItem]) -> Vec<TaggedItem> {
    if filters.is_empty() {
        return items.to_vec();
    }
    items
        .iter()
        .filter(|item| passes(filters, *item))
        .cloned()
        .collect()
}

/// Keep the items matching a single filter.
pub fn apply_filter(filter: &Filter, items: &[TaggedItem]) -> Vec<TaggedItem> {
    items.iter().filter(|item| filter.matches(*item)).cloned().collect()
}
