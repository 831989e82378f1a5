// src/lib.rs
//! myblocks library: a block outliner client over an opaque command backend.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `CommandLineInput`, `AppConfig`
//! - **Domain model**: `Block`, `BlockType`, `Configuration`, `NewBlock`, etc.
//! - **Command gateway**: `CommandGateway`, `Envelope`, `BlockCommands`
//! - **Query cache**: `QueryClient`, `QueryKey`, `QueryState`, `BlockQueries`
//! - **Navigation**: `Route`, `Navigator`
//! - **View**: `ContentView`, `PageView`, `BlockForm`, `render_view`
//! - **Local backend**: `LocalBackend`, `BlockStore`

mod app;
pub mod backend;
mod config;
pub mod constants;
mod error;
pub mod gateway;
mod model;
mod navigation;
pub mod query;
mod types;
pub mod view;

// --- Error Handling ---
pub use crate::error::{AppError, Result};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{AppConfig, CommandLineInput, DATA_FILE_ENV};

// --- Domain Model ---
pub use crate::model::{
    Block, BlockContents, BlockKind, BlockType, BlockVisitor, Bootstrap, Configuration, NewBlock,
    PageBlocks,
};

// --- Domain Types ---
pub use crate::types::{BlockId, Id, WorkspaceId};

// --- Boundary and Cache ---
pub use crate::backend::{BlockStore, LocalBackend};
pub use crate::gateway::{BlockCommands, CommandGateway, Envelope};
pub use crate::query::{BlockQueries, QueryClient, QueryEvent, QueryKey, QueryState};

// --- Navigation and View ---
pub use crate::app::{App, AppResult};
pub use crate::navigation::{Navigator, Route};
pub use crate::view::{
    render_page, render_view, BlockForm, ChildView, ContentView, DebugPanel, PageView,
    SubmitControl, ViewState,
};
