use super::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

/// Longest identifier accepted from a route or the command line.
const MAX_ID_LENGTH: usize = 128;

/// Strong typing for IDs with phantom types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id<T> {
    value: String,
    _phantom: PhantomData<T>,
}

/// Marker types for different ID kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockMarker;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkspaceMarker;

/// Identifier of any block, pages included.
pub type BlockId = Id<BlockMarker>;
/// Identifier of the block acting as the workspace root.
pub type WorkspaceId = Id<WorkspaceMarker>;

impl<T> Id<T> {
    /// Parses a user-supplied identifier (route segment, CLI flag).
    ///
    /// Backend ids are opaque, so the only checks are syntactic: no empty
    /// values, no whitespace and no path separators. Everything else, case
    /// included, is kept as typed.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let normalized = normalize_block_id(input)?;
        Ok(Self::from_normalized(normalized))
    }

    /// Create an ID from a value the backend handed us (trusted as-is).
    pub(crate) fn from_normalized(value: String) -> Self {
        Self {
            value,
            _phantom: PhantomData,
        }
    }

    /// Create a new time-ordered v7 UUID ID
    pub fn new_v7() -> Self {
        Self::from(Uuid::now_v7())
    }

    /// Get the ID as a string reference
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Interprets the id as a UUID, when it is one.
    pub fn as_uuid(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.value).ok()
    }

    /// Re-tags the same identifier with another marker.
    pub fn cast<U>(&self) -> Id<U> {
        Id::from_normalized(self.value.clone())
    }
}

impl WorkspaceId {
    /// The workspace root is itself a block.
    pub fn as_block(&self) -> BlockId {
        self.cast()
    }
}

impl<T> From<Uuid> for Id<T> {
    fn from(uuid: Uuid) -> Self {
        Self::from_normalized(uuid.hyphenated().to_string())
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.value.serialize(serializer)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(Self::from_normalized(value))
    }
}

fn normalize_block_id(input: &str) -> Result<String, ValidationError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(ValidationError::EmptyField("block id"));
    }

    if input.len() > MAX_ID_LENGTH {
        return Err(ValidationError::InvalidId(format!(
            "Invalid ID length: at most {} characters, got {}",
            MAX_ID_LENGTH,
            input.len()
        )));
    }

    if let Some(bad) = input
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
    {
        return Err(ValidationError::InvalidId(format!(
            "ID {:?} contains forbidden character {:?}",
            input, bad
        )));
    }

    Ok(input.to_string())
}
