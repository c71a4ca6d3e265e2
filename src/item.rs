// src/item.rs

//! Tagged items flowing through a pipeline.
//!
//! The scheduler only needs two capabilities from an item: the list of
//! `(name, value)` tags it carries, and a handful of fixed attributes such as
//! its filename. Both are expressed by the [`Taggable`] trait so that filter
//! matching never has to know which concrete item type it is looking at.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single `(name, value)` tag on an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Fixed (non-tag) attributes a filter can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    Filename,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::Filename => f.write_str("filename"),
        }
    }
}

/// Capability interface used by filters.
pub trait Taggable {
    fn tags(&self) -> &[Tag];

    fn attribute(&self, kind: AttributeKind) -> Option<&str>;

    /// Values of every tag called `name`, in tag order.
    fn tag_values<'a>(&'a self, name: &'a str) -> Box<dyn Iterator<Item = &'a str> + 'a> {
        Box::new(
            self.tags()
                .iter()
                .filter(move |t| t.name == name)
                .map(|t| t.value.as_str()),
        )
    }
}

/// The concrete item type carried by the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaggedItem {
    /// Human-readable identifier, used in logs only.
    pub name: String,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

impl TaggedItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: None,
            tags: Vec::new(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    /// Set `name` to `value`, replacing any existing tags of that name.
    pub fn set_tag(&mut self, name: &str, value: impl Into<String>) {
        self.tags.retain(|t| t.name != name);
        self.tags.push(Tag::new(name, value));
    }
}

impl Taggable for TaggedItem {
    fn tags(&self) -> &[Tag] {
        &self.tags
    }

    fn attribute(&self, kind: AttributeKind) -> Option<&str> {
        match kind {
            AttributeKind::Filename => self.filename.as_deref(),
        }
    }
}

/// Clone `items` into a new list, dropping repeats and keeping first-seen order.
pub(crate) fn unique_items<'a>(items: impl IntoIterator<Item = &'a TaggedItem>) -> Vec<TaggedItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(*item))
        .cloned()
        .collect()
}
