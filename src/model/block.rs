use crate::types::BlockId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rendering tag of a block.
///
/// `text` and `paragraph` are kept apart: the backend stores paragraphs
/// created through the input form as `text`, but a payload tagged
/// `paragraph` is still accepted and renders the same way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockType {
    Workspace,
    Page,
    Text,
    Paragraph,
    /// A tag this client does not know; kept verbatim.
    Other(String),
}

impl BlockType {
    pub fn as_str(&self) -> &str {
        match self {
            BlockType::Workspace => "workspace",
            BlockType::Page => "page",
            BlockType::Text => "text",
            BlockType::Paragraph => "paragraph",
            BlockType::Other(tag) => tag,
        }
    }

    /// Whether blocks of this type render as static text.
    pub fn is_textual(&self) -> bool {
        matches!(self, BlockType::Text | BlockType::Paragraph)
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "workspace" => BlockType::Workspace,
            "page" => BlockType::Page,
            "text" => BlockType::Text,
            "paragraph" => BlockType::Paragraph,
            _ => BlockType::Other(tag),
        }
    }
}

impl From<BlockType> for String {
    fn from(block_type: BlockType) -> Self {
        block_type.as_str().to_string()
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-dependent payload of a block.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockContents {
    /// The type chosen at creation (`paragraph`, `page`, `workspace`).
    #[serde(default)]
    pub content_type: String,
    /// Plain text for text blocks, the title for pages. The workspace block
    /// keeps its home page id here.
    #[serde(default)]
    pub contents: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

impl BlockContents {
    pub fn new(content_type: impl Into<String>, raw_data: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            contents: Some(raw_data.into()),
            title: None,
        }
    }

    /// The displayable text: `contents`, else `title`, else nothing.
    pub fn text(&self) -> &str {
        self.contents
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }
}

/// A block as it crosses the command boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(default)]
    pub parent_id: Option<BlockId>,
    pub block_type: BlockType,
    pub block_contents: BlockContents,
    #[serde(default)]
    pub block_order: Option<i32>,
    #[serde(default)]
    pub favorite: bool,
    /// Only populated when the block was fetched by id.
    #[serde(default)]
    pub children: Vec<Block>,
    #[serde(default)]
    pub created_at_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at_utc: Option<DateTime<Utc>>,
}

impl Block {
    /// A fresh, not yet stored block.
    pub fn new(
        id: BlockId,
        parent_id: Option<BlockId>,
        block_type: BlockType,
        block_contents: BlockContents,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent_id,
            block_type,
            block_contents,
            block_order: None,
            favorite: false,
            children: Vec::new(),
            created_at_utc: Some(now),
            updated_at_utc: Some(now),
        }
    }

    pub fn is_page(&self) -> bool {
        self.block_type == BlockType::Page
    }

    /// The text shown for this block (title for pages).
    ///
    /// A workspace's `contents` is its home page id, so its title wins.
    pub fn display_text(&self) -> &str {
        match (&self.block_type, self.block_contents.title.as_deref()) {
            (BlockType::Workspace, Some(title)) => title,
            _ => self.block_contents.text(),
        }
    }

    /// Copy of the block without its children.
    pub fn without_children(&self) -> Self {
        Self {
            children: Vec::new(),
            ..self.clone()
        }
    }

    /// Accept a visitor
    pub fn accept<V: BlockVisitor>(&self, visitor: &mut V) -> V::Output {
        match &self.block_type {
            BlockType::Page => visitor.visit_page(self),
            BlockType::Text | BlockType::Paragraph => visitor.visit_text(self),
            BlockType::Workspace => visitor.visit_workspace(self),
            BlockType::Other(tag) => visitor.visit_unsupported(self, tag),
        }
    }
}

/// Visitor trait for dispatching on a block's type.
///
/// All methods have default implementations that return `Default::default()`,
/// so implementors only need to override the methods they care about.
pub trait BlockVisitor {
    type Output: Default;

    fn visit_page(&mut self, _block: &Block) -> Self::Output {
        Default::default()
    }
    fn visit_text(&mut self, _block: &Block) -> Self::Output {
        Default::default()
    }
    fn visit_workspace(&mut self, _block: &Block) -> Self::Output {
        Default::default()
    }
    fn visit_unsupported(&mut self, _block: &Block, _block_type: &str) -> Self::Output {
        Default::default()
    }
}
