// src/dag/key.rs

//! Execution keys: which "run" of a node a piece of state belongs to.

use std::fmt;

use crate::filter::Filter;

/// Identifies one run of a node.
///
/// `Blank` is the plain, non-iterated run. `Grouped` carries the grouping
/// filters of every enclosing iterator, outermost first, so nested fan-outs
/// over the same tag value never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum ExecutionKey {
    #[default]
    Blank,
    Grouped(Vec<Filter>),
}

impl ExecutionKey {
    pub fn is_blank(&self) -> bool {
        matches!(self, ExecutionKey::Blank)
    }

    /// Key of a run nested inside this one for the group `filter`.
    pub fn child(&self, filter: &Filter) -> ExecutionKey {
        match self {
            ExecutionKey::Blank => ExecutionKey::Grouped(vec![filter.clone()]),
            ExecutionKey::Grouped(path) => {
                let mut path = path.clone();
                path.push(filter.clone());
                ExecutionKey::Grouped(path)
            }
        }
    }

    /// Key of the enclosing run. The parent of `Blank` is `Blank`.
    pub fn parent(&self) -> ExecutionKey {
        match self {
            ExecutionKey::Blank => ExecutionKey::Blank,
            ExecutionKey::Grouped(path) if path.len() <= 1 => ExecutionKey::Blank,
            ExecutionKey::Grouped(path) => ExecutionKey::Grouped(path[..path.len() - 1].to_vec()),
        }
    }

    /// Innermost grouping filter, if any.
    pub fn group(&self) -> Option<&Filter> {
        match self {
            ExecutionKey::Blank => None,
            ExecutionKey::Grouped(path) => path.last(),
        }
    }
}

impl fmt::Display for ExecutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionKey::Blank => f.write_str("<blank>"),
            ExecutionKey::Grouped(path) => {
                for (i, filter) in path.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" / ")?;
                    }
                    write!(f, "{filter}")?;
                }
                Ok(())
            }
        }
    }
}

/// Key for a run selected by `filter`; `None` gives the blank key.
pub fn execution_key(filter: Option<&Filter>) -> ExecutionKey {
    match filter {
        None => ExecutionKey::Blank,
        Some(f) => ExecutionKey::Grouped(vec![f.clone()]),
    }
}

/// The grouping filters a key was built from, outermost first.
pub fn filters_of(key: &ExecutionKey) -> Vec<Filter> {
    match key {
        ExecutionKey::Blank => Vec::new(),
        ExecutionKey::Grouped(path) => path.clone(),
    }
}
