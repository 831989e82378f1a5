mod block;

pub use block::{Block, BlockContents, BlockType, BlockVisitor};

use crate::types::{BlockId, WorkspaceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Process-wide bootstrap data, loaded once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub workspace_id: WorkspaceId,
}

/// Result of the compound configuration query: the configuration plus the
/// workspace block it points at.
#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    pub configuration: Configuration,
    pub workspace: Block,
}

impl Bootstrap {
    /// The block shown on the root route.
    ///
    /// The workspace block's `contents` hold its home page id. A workspace
    /// without one (empty or not an id) falls back to itself.
    pub fn root_block_id(&self) -> BlockId {
        self.workspace
            .block_contents
            .contents
            .as_deref()
            .and_then(|contents| BlockId::parse(contents).ok())
            .unwrap_or_else(|| self.workspace.id.clone())
    }
}

/// The kind of block the input form creates, sent as `blockType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    #[default]
    Paragraph,
    Page,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Page => "page",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters of `create_block_command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBlock {
    pub raw_data: String,
    pub block_type: BlockKind,
    pub parent_id: BlockId,
}

/// Payload of `load_blocks_for_page_command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageBlocks {
    pub page_id: Option<BlockId>,
    pub blocks: Vec<Block>,
}
