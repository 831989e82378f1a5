// src/view/page.rs
//! The content view: header, child list, input form and debug panel.

use super::form::BlockForm;
use crate::error::AppError;
use crate::model::{Block, BlockVisitor};
use crate::navigation::Route;
use crate::query::{BlockQueries, QueryState};
use crate::types::BlockId;
use std::sync::Arc;

/// One entry of the child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildView {
    /// A page child: a navigable link.
    Link {
        id: BlockId,
        title: String,
        route: Route,
    },
    /// A text or paragraph child: static content.
    Text { id: BlockId, text: String },
    /// A block type this client does not render specially.
    Other {
        id: BlockId,
        block_type: String,
        text: String,
    },
}

impl ChildView {
    pub fn id(&self) -> &BlockId {
        match self {
            ChildView::Link { id, .. } | ChildView::Text { id, .. } | ChildView::Other { id, .. } => {
                id
            }
        }
    }
}

/// Builds a child entry from a block's type.
struct ChildViewBuilder;

impl BlockVisitor for ChildViewBuilder {
    type Output = Option<ChildView>;

    fn visit_page(&mut self, block: &Block) -> Self::Output {
        Some(ChildView::Link {
            id: block.id.clone(),
            title: block.display_text().to_string(),
            route: Route::page(&block.id),
        })
    }

    fn visit_text(&mut self, block: &Block) -> Self::Output {
        Some(ChildView::Text {
            id: block.id.clone(),
            text: block.display_text().to_string(),
        })
    }

    fn visit_workspace(&mut self, block: &Block) -> Self::Output {
        log::warn!("Workspace block {} listed as a child, skipping", block.id);
        None
    }

    fn visit_unsupported(&mut self, block: &Block, block_type: &str) -> Self::Output {
        Some(ChildView::Other {
            id: block.id.clone(),
            block_type: block_type.to_string(),
            text: block.display_text().to_string(),
        })
    }
}

/// Raw block fields, printed unconditionally for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugPanel {
    pub id: String,
    pub block_type: String,
    /// `block_contents` as JSON.
    pub contents: String,
    pub parent_id: Option<String>,
}

impl DebugPanel {
    pub fn from_block(block: &Block) -> Self {
        Self {
            id: block.id.to_string(),
            block_type: block.block_type.to_string(),
            contents: serde_json::to_string(&block.block_contents).unwrap_or_default(),
            parent_id: block.parent_id.as_ref().map(ToString::to_string),
        }
    }
}

/// Everything the content view shows for a resolved block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub header: String,
    pub children: Vec<ChildView>,
    pub form: BlockForm,
    pub debug: DebugPanel,
}

impl PageView {
    /// Lays out `block`; children keep the order the backend returned.
    pub fn from_block(block: &Block) -> Self {
        let mut builder = ChildViewBuilder;
        Self {
            header: block.display_text().to_string(),
            children: block
                .children
                .iter()
                .filter_map(|child| child.accept(&mut builder))
                .collect(),
            form: BlockForm::new(block.id.clone()),
            debug: DebugPanel::from_block(block),
        }
    }

    /// The `n`-th child (1-based, as rendered).
    pub fn child(&self, n: usize) -> Option<&ChildView> {
        n.checked_sub(1).and_then(|index| self.children.get(index))
    }
}

/// What the content view currently displays.
#[derive(Debug, Clone)]
pub enum ViewState {
    /// Nothing to show yet.
    Loading,
    Ready(PageView),
    Failed(Arc<AppError>),
}

impl ViewState {
    pub fn page(&self) -> Option<&PageView> {
        match self {
            ViewState::Ready(page) => Some(page),
            _ => None,
        }
    }

    pub fn page_mut(&mut self) -> Option<&mut PageView> {
        match self {
            ViewState::Ready(page) => Some(page),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<AppError>> {
        match self {
            ViewState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

impl From<QueryState<Block>> for ViewState {
    fn from(state: QueryState<Block>) -> Self {
        match state {
            QueryState::Pending => ViewState::Loading,
            QueryState::Resolved(block) => ViewState::Ready(PageView::from_block(&block)),
            QueryState::Failed(error) => ViewState::Failed(error),
        }
    }
}

/// Resolves a block id to what the content view shows.
#[derive(Debug, Clone)]
pub struct ContentView {
    queries: BlockQueries,
}

impl ContentView {
    pub fn new(queries: BlockQueries) -> Self {
        Self { queries }
    }

    /// Waits for the block and lays it out.
    pub async fn load(&self, id: &BlockId) -> ViewState {
        match self.queries.displayed_block(id).await {
            Ok(block) => {
                log::debug!("Displayed page {} ({} children)", id, block.children.len());
                ViewState::Ready(PageView::from_block(&block))
            }
            Err(error) => {
                log::error!("Could not load block {}: {}", id, error);
                ViewState::Failed(error)
            }
        }
    }

    /// Current state without waiting; starts the fetch if needed.
    pub fn poll(&self, id: &BlockId) -> ViewState {
        self.queries.poll_displayed_block(id).into()
    }
}
