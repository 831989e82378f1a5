// src/backend/mod.rs
//! A local, in-process backend answering the block commands.
//!
//! [`LocalBackend`] plays the part of the host process: it receives a
//! command name and JSON parameters and answers with an [`Envelope`].
//! Anything that goes wrong while serving a command becomes a failure
//! envelope; only an unknown command name is a transport error.

mod store;

pub use store::BlockStore;

use crate::constants::{
    CHANGE_BLOCK_ORDER_COMMAND, CREATE_BLOCK_COMMAND, GET_BLOCK_COMMAND,
    LOAD_BLOCKS_FOR_PAGE_COMMAND, LOAD_CONFIGURATION_COMMAND, LOAD_HOME_PAGE_COMMAND,
};
use crate::error::AppError;
use crate::gateway::{CommandGateway, Envelope};
use crate::model::{BlockKind, NewBlock, PageBlocks};
use crate::types::{BlockId, WorkspaceId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetBlockParams {
    block_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateBlockParams {
    raw_data: String,
    block_type: String,
    parent_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageParams {
    page_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeOrderParams {
    block_id: String,
    new_order: i32,
}

/// Serves the block commands from a [`BlockStore`].
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: Arc<BlockStore>,
    workspace_id: Option<WorkspaceId>,
}

impl LocalBackend {
    pub fn new(store: Arc<BlockStore>) -> Self {
        Self {
            store,
            workspace_id: None,
        }
    }

    /// Pins the workspace `load_configuration_command` reports.
    pub fn with_workspace(mut self, workspace_id: WorkspaceId) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    pub fn store(&self) -> &Arc<BlockStore> {
        &self.store
    }

    fn dispatch(&self, command: &str, params: Value) -> Result<Envelope, AppError> {
        match command {
            LOAD_CONFIGURATION_COMMAND => {
                let configuration = self
                    .store
                    .find_or_create_workspace(self.workspace_id.as_ref())?;
                encode(command, &configuration)
            }
            GET_BLOCK_COMMAND => {
                let params: GetBlockParams = parse_params(command, params)?;
                let block = self.store.get(&block_id(&params.block_id)?)?;
                encode(command, &block)
            }
            CREATE_BLOCK_COMMAND => {
                let params: CreateBlockParams = parse_params(command, params)?;
                let new_block = NewBlock {
                    raw_data: params.raw_data,
                    block_type: block_kind(&params.block_type),
                    parent_id: block_id(&params.parent_id)?,
                };
                let block = self.store.create(&new_block)?;
                encode(command, &block)
            }
            LOAD_BLOCKS_FOR_PAGE_COMMAND => {
                let params: PageParams = parse_params(command, params)?;
                let page_id = block_id(&params.page_id)?;
                let blocks = self.store.children(&page_id)?;
                encode(
                    command,
                    &PageBlocks {
                        page_id: Some(page_id),
                        blocks,
                    },
                )
            }
            CHANGE_BLOCK_ORDER_COMMAND => {
                let params: ChangeOrderParams = parse_params(command, params)?;
                let block = self
                    .store
                    .change_order(&block_id(&params.block_id)?, params.new_order)?;
                encode(command, &block)
            }
            LOAD_HOME_PAGE_COMMAND => {
                // Make sure a workspace exists before looking for its home page.
                self.store
                    .find_or_create_workspace(self.workspace_id.as_ref())?;
                encode(command, &self.store.home_page()?)
            }
            other => Err(AppError::Transport(format!("unknown command: {}", other))),
        }
    }

    /// Answers `command` in its wire form: a JSON string on success,
    /// `{ "ok": false, "error": ... }` on failure.
    pub fn reply(&self, command: &str, params: Value) -> Result<Value, AppError> {
        log::debug!("Running {}", command);
        let envelope = match self.dispatch(command, params) {
            Ok(envelope) => envelope,
            Err(error @ AppError::Transport(_)) => return Err(error),
            Err(error) => {
                let message = failure_message(&error);
                log::warn!("{} failed: {}", command, message);
                Envelope::failure(message)
            }
        };
        Ok(envelope.to_raw())
    }
}

#[async_trait::async_trait]
impl CommandGateway for LocalBackend {
    async fn invoke(&self, command: &str, params: Value) -> Result<Envelope, AppError> {
        let raw = self.reply(command, params)?;
        Envelope::from_raw(command, raw)
    }
}

fn parse_params<T: DeserializeOwned>(command: &str, params: Value) -> Result<T, AppError> {
    serde_json::from_value(params).map_err(|e| {
        AppError::gateway(command, format!("invalid parameters for {}: {}", command, e))
    })
}

fn block_id(raw: &str) -> Result<BlockId, AppError> {
    BlockId::parse(raw).map_err(|e| AppError::Storage(format!("invalid block id: {}", e)))
}

/// Pages stay pages; every other requested type is stored as text.
fn block_kind(raw: &str) -> BlockKind {
    match raw {
        "page" => BlockKind::Page,
        "paragraph" | "text" => BlockKind::Paragraph,
        other => {
            log::warn!("Unknown block type '{}', storing as text", other);
            BlockKind::Paragraph
        }
    }
}

fn encode<T: Serialize>(command: &str, value: &T) -> Result<Envelope, AppError> {
    Envelope::encode(value).map_err(|source| AppError::Decode {
        command: command.to_string(),
        source,
    })
}

/// The text sent back in a failure envelope.
fn failure_message(error: &AppError) -> String {
    match error {
        AppError::Storage(message) => message.clone(),
        AppError::Gateway { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
