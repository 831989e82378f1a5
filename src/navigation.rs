// src/navigation.rs
//! Routes and the navigation state machine.
//!
//! Two routes exist: `/` (the workspace's home page) and `/page/:id`.
//! The navigator only decides which block id the content view shows; it
//! does not check that the id exists, the backend reports that.

use crate::error::AppError;
use crate::model::{Block, Bootstrap};
use crate::types::BlockId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static PAGE_ROUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^/page/([^/?#]+)/?$").expect("Failed to compile page route regex")
});

/// A navigable location.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Route {
    /// `/`
    #[default]
    Root,
    /// `/page/:id`
    PageById(BlockId),
}

impl Route {
    /// Parses a path into a route.
    pub fn parse(path: &str) -> Result<Self, AppError> {
        let path = path.trim();
        if path == "/" || path.is_empty() {
            return Ok(Route::Root);
        }

        let captures = PAGE_ROUTE
            .captures(path)
            .ok_or_else(|| AppError::UnknownRoute(path.to_string()))?;
        let id = captures
            .get(1)
            .map(|m| m.as_str())
            .ok_or_else(|| AppError::UnknownRoute(path.to_string()))?;
        Ok(Route::PageById(BlockId::parse(id)?))
    }

    /// The link target for a block's page.
    pub fn page(id: &BlockId) -> Self {
        Route::PageById(id.clone())
    }

    pub fn path(&self) -> String {
        match self {
            Route::Root => "/".to_string(),
            Route::PageById(id) => format!("/page/{}", id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Tracks the current route and where the user came from.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    current: Route,
    history: Vec<Route>,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts at `route` with no history.
    pub fn at(route: Route) -> Self {
        Self {
            current: route,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> &Route {
        &self.current
    }

    /// Moves to `route`; re-opening the current route is a no-op.
    pub fn open(&mut self, route: Route) -> &Route {
        if route != self.current {
            log::debug!("Navigating {} -> {}", self.current, route);
            let previous = std::mem::replace(&mut self.current, route);
            self.history.push(previous);
        }
        &self.current
    }

    /// Activates a block's link. Only pages are navigable.
    pub fn follow(&mut self, block: &Block) -> Result<&Route, AppError> {
        if !block.is_page() {
            return Err(AppError::NotAPage {
                id: block.id.to_string(),
                block_type: block.block_type.to_string(),
            });
        }
        Ok(self.open(Route::page(&block.id)))
    }

    /// The explicit home link.
    pub fn go_home(&mut self) -> &Route {
        self.open(Route::Root)
    }

    /// Returns to the previous route, if any.
    pub fn back(&mut self) -> Option<&Route> {
        let previous = self.history.pop()?;
        log::debug!("Navigating back {} -> {}", self.current, previous);
        self.current = previous;
        Some(&self.current)
    }

    /// The block id the content view should show.
    pub fn target(&self, bootstrap: &Bootstrap) -> BlockId {
        match &self.current {
            Route::Root => bootstrap.root_block_id(),
            Route::PageById(id) => id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContents, BlockType, Configuration};
    use crate::types::WorkspaceId;
    use pretty_assertions::assert_eq;

    fn block(id: &str, block_type: BlockType) -> Block {
        Block::new(
            BlockId::parse(id).unwrap(),
            None,
            block_type,
            BlockContents::new("page", id),
        )
    }

    fn bootstrap() -> Bootstrap {
        Bootstrap {
            configuration: Configuration {
                workspace_id: WorkspaceId::parse("W").unwrap(),
            },
            workspace: Block::new(
                BlockId::parse("W").unwrap(),
                None,
                BlockType::Workspace,
                BlockContents::new("workspace", "H"),
            ),
        }
    }

    #[test]
    fn parses_both_routes() {
        assert_eq!(Route::parse("/").unwrap(), Route::Root);
        assert_eq!(
            Route::parse("/page/abc").unwrap(),
            Route::PageById(BlockId::parse("abc").unwrap())
        );
        assert_eq!(
            Route::parse("/page/abc/").unwrap(),
            Route::PageById(BlockId::parse("abc").unwrap())
        );
    }

    #[test]
    fn rejects_unknown_routes() {
        for path in ["/pages/abc", "/page/", "/page/a/b", "page/abc", "/settings"] {
            assert!(
                matches!(Route::parse(path), Err(AppError::UnknownRoute(_))),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn paths_round_trip() {
        let route = Route::page(&BlockId::parse("abc").unwrap());
        assert_eq!(route.path(), "/page/abc");
        assert_eq!(Route::parse(&route.path()).unwrap(), route);
        assert_eq!(Route::Root.to_string(), "/");
    }

    #[test]
    fn root_targets_the_home_page_and_pages_target_themselves() {
        let mut navigator = Navigator::new();
        assert_eq!(navigator.target(&bootstrap()).as_str(), "H");

        navigator.follow(&block("child", BlockType::Page)).unwrap();
        assert_eq!(navigator.target(&bootstrap()).as_str(), "child");

        navigator.go_home();
        assert_eq!(navigator.current(), &Route::Root);
    }

    #[test]
    fn only_pages_can_be_followed() {
        let mut navigator = Navigator::new();
        let err = navigator
            .follow(&block("note", BlockType::Text))
            .unwrap_err();
        assert!(matches!(err, AppError::NotAPage { .. }));
        assert_eq!(navigator.current(), &Route::Root);
    }

    #[test]
    fn back_walks_the_history() {
        let mut navigator = Navigator::new();
        navigator.follow(&block("a", BlockType::Page)).unwrap();
        navigator.follow(&block("b", BlockType::Page)).unwrap();
        navigator.follow(&block("b", BlockType::Page)).unwrap();

        assert_eq!(navigator.back().unwrap().path(), "/page/a");
        assert_eq!(navigator.back().unwrap(), &Route::Root);
        assert!(navigator.back().is_none());
    }
}
