// src/query/key.rs
//! Composite cache keys: a query name followed by parameter maps.

use crate::constants::{DISPLAYED_BLOCK_QUERY, LOAD_CONFIGURATION_QUERY};
use crate::types::BlockId;
use std::collections::BTreeMap;
use std::fmt;

/// One element of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    Name(String),
    /// Parameters, ordered by name so equal maps hash equally.
    Params(BTreeMap<String, String>),
}

/// Identity of a cached query, e.g. `["displayedBlock", {"id": "X"}]`.
///
/// Keys compare segment by segment; [`QueryKey::starts_with`] is what
/// prefix invalidation matches on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    segments: Vec<KeySegment>,
}

impl QueryKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            segments: vec![KeySegment::Name(name.into())],
        }
    }

    /// Appends a name segment.
    pub fn then(mut self, name: impl Into<String>) -> Self {
        self.segments.push(KeySegment::Name(name.into()));
        self
    }

    /// Adds a parameter to the trailing parameter map, opening one if the
    /// last segment is a name.
    pub fn with_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        match self.segments.last_mut() {
            Some(KeySegment::Params(params)) => {
                params.insert(name.into(), value.to_string());
            }
            _ => {
                let mut params = BTreeMap::new();
                params.insert(name.into(), value.to_string());
                self.segments.push(KeySegment::Params(params));
            }
        }
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// `["displayedBlock", {id}]`
    pub fn displayed_block(id: &BlockId) -> Self {
        Self::displayed_block_family().with_param("id", id)
    }

    /// `["displayedBlock"]`, the prefix of every displayed block query.
    pub fn displayed_block_family() -> Self {
        Self::new(DISPLAYED_BLOCK_QUERY)
    }

    /// `["loadConfiguration"]`
    pub fn load_configuration() -> Self {
        Self::new(LOAD_CONFIGURATION_QUERY)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            match segment {
                KeySegment::Name(name) => write!(f, "{:?}", name)?,
                KeySegment::Params(params) => {
                    f.write_str("{")?;
                    for (j, (name, value)) in params.iter().enumerate() {
                        if j > 0 {
                            f.write_str(",")?;
                        }
                        write!(f, "{:?}:{:?}", name, value)?;
                    }
                    f.write_str("}")?;
                }
            }
        }
        f.write_str("]")
    }
}
