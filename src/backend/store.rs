// src/backend/store.rs
//! In-process block storage with an optional JSON file behind it.
//!
//! The whole tree lives in memory. A mutation is applied to a copy, the
//! copy is written out (temp file, then rename) and only then replaces the
//! live tree, so a failed write changes nothing.

use crate::constants::{HOME_PAGE_TITLE, WORKSPACE_TITLE};
use crate::error::AppError;
use crate::model::{Block, BlockContents, BlockKind, BlockType, Configuration, NewBlock};
use crate::types::{BlockId, WorkspaceId};
use chrono::Utc;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// What goes to disk: blocks in insertion order, without children.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    workspace_id: Option<WorkspaceId>,
    #[serde(default)]
    blocks: IndexMap<BlockId, Block>,
}

impl Snapshot {
    fn find(&self, id: &BlockId) -> Result<&Block, AppError> {
        self.blocks.get(id).ok_or_else(|| not_found(id))
    }

    /// Direct children of `parent`, by `block_order` then insertion order.
    fn children_of(&self, parent: &BlockId) -> Vec<&Block> {
        let mut children: Vec<&Block> = self
            .blocks
            .values()
            .filter(|block| block.parent_id.as_ref() == Some(parent))
            .collect();
        children.sort_by_key(|block| block.block_order.unwrap_or_default());
        children
    }

    fn next_order(&self, parent: &BlockId) -> i32 {
        self.children_of(parent)
            .last()
            .map(|last| last.block_order.unwrap_or_default() + 1)
            .unwrap_or_default()
    }

    fn insert(
        &mut self,
        parent_id: Option<BlockId>,
        block_type: BlockType,
        contents: BlockContents,
    ) -> Block {
        let mut block = Block::new(BlockId::new_v7(), parent_id, block_type, contents);
        block.block_order = Some(
            block
                .parent_id
                .as_ref()
                .map(|parent| self.next_order(parent))
                .unwrap_or_default(),
        );
        self.blocks.insert(block.id.clone(), block.clone());
        block
    }

    /// The page the workspace block names in its `contents`, else its
    /// first favourite page.
    fn home_of(&self, workspace: &BlockId) -> Option<&Block> {
        let named = self
            .blocks
            .get(workspace)
            .and_then(|block| block.block_contents.contents.as_deref())
            .and_then(|id| BlockId::parse(id).ok())
            .and_then(|id| self.blocks.get(&id))
            .filter(|home| home.is_page() && home.parent_id.as_ref() == Some(workspace));
        named.or_else(|| {
            self.children_of(workspace)
                .into_iter()
                .find(|block| block.favorite && block.is_page())
        })
    }

    fn points_at(&self, workspace: &BlockId, home: &BlockId) -> bool {
        self.blocks
            .get(workspace)
            .and_then(|block| block.block_contents.contents.as_deref())
            == Some(home.as_str())
    }

    /// Returns the workspace's home page, creating it when missing, and
    /// stores its id in the workspace block's `contents`.
    fn ensure_home_page(&mut self, workspace: &BlockId) -> Block {
        let home = match self.home_of(workspace) {
            Some(home) => home.without_children(),
            None => {
                let mut home = self.insert(
                    Some(workspace.clone()),
                    BlockType::Page,
                    BlockContents::new(BlockKind::Page.as_str(), HOME_PAGE_TITLE),
                );
                home.favorite = true;
                self.blocks.insert(home.id.clone(), home.clone());
                log::info!("Created home page {} in workspace {}", home.id, workspace);
                home
            }
        };

        if !self.points_at(workspace, &home.id) {
            if let Some(block) = self.blocks.get_mut(workspace) {
                block.block_contents.contents = Some(home.id.to_string());
                block.updated_at_utc = Some(Utc::now());
            }
        }
        home
    }
}

fn not_found(id: &BlockId) -> AppError {
    AppError::Storage(format!("block not found: {}", id))
}

/// The block tree served by the local backend.
#[derive(Debug)]
pub struct BlockStore {
    path: Option<PathBuf>,
    state: RwLock<Snapshot>,
}

impl BlockStore {
    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: RwLock::new(Snapshot::default()),
        }
    }

    /// Loads the snapshot at `path`; a missing file starts an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AppError> {
        let path = path.into();
        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content).map_err(|e| {
                AppError::Storage(format!("could not read {}: {}", path.display(), e))
            })?
        } else {
            log::info!("No block store at {}, starting empty", path.display());
            Snapshot::default()
        };
        log::debug!(
            "Opened block store {} ({} blocks)",
            path.display(),
            snapshot.blocks.len()
        );
        Ok(Self {
            path: Some(path),
            state: RwLock::new(snapshot),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.state.read().blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().blocks.is_empty()
    }

    /// Returns the configured workspace, creating it (and its "Home" page)
    /// on first use.
    ///
    /// `requested` pins the workspace id; it is only honoured when the store
    /// has no workspace yet or already contains that block. A workspace
    /// whose home page went missing gets a new one.
    pub fn find_or_create_workspace(
        &self,
        requested: Option<&WorkspaceId>,
    ) -> Result<Configuration, AppError> {
        let mut state = self.state.write();

        let existing = match requested {
            Some(id) if state.blocks.contains_key(&id.as_block()) => Some(id.clone()),
            Some(_) => None,
            None => state
                .workspace_id
                .clone()
                .filter(|id| state.blocks.contains_key(&id.as_block())),
        };

        let mut next = state.clone();
        let workspace_id = match existing {
            Some(workspace_id) => workspace_id,
            None => {
                let workspace_id = requested.cloned().unwrap_or_else(WorkspaceId::new_v7);
                let mut workspace = Block::new(
                    workspace_id.as_block(),
                    None,
                    BlockType::Workspace,
                    BlockContents {
                        content_type: BlockType::Workspace.as_str().to_string(),
                        contents: None,
                        title: Some(WORKSPACE_TITLE.to_string()),
                    },
                );
                workspace.block_order = Some(0);
                next.blocks.insert(workspace.id.clone(), workspace);
                log::info!("Created workspace {}", workspace_id);
                workspace_id
            }
        };
        next.workspace_id = Some(workspace_id.clone());
        next.ensure_home_page(&workspace_id.as_block());

        if next != *state {
            self.commit(&mut state, next)?;
        }
        Ok(Configuration { workspace_id })
    }

    /// The block with its ordered children (one level deep).
    pub fn get(&self, id: &BlockId) -> Result<Block, AppError> {
        let state = self.state.read();
        let mut block = state.find(id)?.clone();
        block.children = state
            .children_of(id)
            .into_iter()
            .map(Block::without_children)
            .collect();
        Ok(block)
    }

    /// Children of `parent` in display order, without their own children.
    pub fn children(&self, parent: &BlockId) -> Result<Vec<Block>, AppError> {
        let state = self.state.read();
        state.find(parent)?;
        Ok(state
            .children_of(parent)
            .into_iter()
            .map(Block::without_children)
            .collect())
    }

    /// Appends a new child under `new_block.parent_id`.
    ///
    /// Paragraphs are stored as `text` blocks.
    pub fn create(&self, new_block: &NewBlock) -> Result<Block, AppError> {
        let mut state = self.state.write();
        state.find(&new_block.parent_id)?;

        let block_type = match new_block.block_type {
            BlockKind::Page => BlockType::Page,
            BlockKind::Paragraph => BlockType::Text,
        };
        let mut next = state.clone();
        let block = next.insert(
            Some(new_block.parent_id.clone()),
            block_type,
            BlockContents::new(new_block.block_type.as_str(), new_block.raw_data.clone()),
        );
        self.commit(&mut state, next)?;
        Ok(block)
    }

    /// Moves a block to position `new_order` among its siblings.
    ///
    /// Siblings are renumbered `0..n`; out-of-range positions are clamped.
    pub fn change_order(&self, id: &BlockId, new_order: i32) -> Result<Block, AppError> {
        let mut state = self.state.write();
        let parent = state.find(id)?.parent_id.clone().ok_or_else(|| {
            AppError::Storage(format!("block {} has no parent to reorder within", id))
        })?;

        let mut siblings: Vec<BlockId> = state
            .children_of(&parent)
            .into_iter()
            .map(|block| block.id.clone())
            .filter(|sibling| sibling != id)
            .collect();
        let position = usize::try_from(new_order.max(0))
            .unwrap_or_default()
            .min(siblings.len());
        siblings.insert(position, id.clone());

        let mut next = state.clone();
        let now = Utc::now();
        for (order, sibling) in (0..).zip(siblings.iter()) {
            if let Some(block) = next.blocks.get_mut(sibling) {
                if block.block_order != Some(order) {
                    block.block_order = Some(order);
                    block.updated_at_utc = Some(now);
                }
            }
        }
        self.commit(&mut state, next)?;
        log::debug!("Moved block {} to position {} under {}", id, position, parent);
        state.find(id).cloned()
    }

    /// The page the workspace block points at, created when missing.
    pub fn home_page(&self) -> Result<Block, AppError> {
        let mut state = self.state.write();
        let workspace = state
            .workspace_id
            .as_ref()
            .map(WorkspaceId::as_block)
            .ok_or_else(|| {
                AppError::MissingConfiguration("no workspace has been created".to_string())
            })?;
        state.find(&workspace)?;

        if let Some(home) = state
            .home_of(&workspace)
            .filter(|home| state.points_at(&workspace, &home.id))
        {
            return Ok(home.without_children());
        }

        let mut next = state.clone();
        let home = next.ensure_home_page(&workspace);
        self.commit(&mut state, next)?;
        Ok(home)
    }

    /// Writes `next` out, then makes it the live tree.
    fn commit(&self, state: &mut Snapshot, next: Snapshot) -> Result<(), AppError> {
        self.persist(&next)?;
        *state = next;
        Ok(())
    }

    /// Writes the snapshot next to its target, then renames it into place.
    fn persist(&self, snapshot: &Snapshot) -> Result<(), AppError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| AppError::Storage(format!("could not encode blocks: {}", e)))?;
        let temp = path.with_extension("json.tmp");
        fs::write(&temp, json)?;
        fs::rename(&temp, path)?;
        log::debug!("Saved {} blocks to {}", snapshot.blocks.len(), path.display());
        Ok(())
    }
}
