// src/gateway/commands.rs
//! Typed wrappers for the commands the client consumes.

use super::CommandGateway;
use crate::constants::{
    CHANGE_BLOCK_ORDER_COMMAND, CREATE_BLOCK_COMMAND, GET_BLOCK_COMMAND,
    LOAD_BLOCKS_FOR_PAGE_COMMAND, LOAD_CONFIGURATION_COMMAND, LOAD_HOME_PAGE_COMMAND,
};
use crate::error::AppError;
use crate::model::{Block, Bootstrap, Configuration, NewBlock, PageBlocks};
use crate::types::BlockId;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;

/// Typed access to the backend's block commands.
#[derive(Clone)]
pub struct BlockCommands {
    gateway: Arc<dyn CommandGateway>,
}

impl std::fmt::Debug for BlockCommands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCommands").finish_non_exhaustive()
    }
}

impl BlockCommands {
    pub fn new(gateway: Arc<dyn CommandGateway>) -> Self {
        Self { gateway }
    }

    /// Invokes `command` and decodes its payload.
    async fn call<T: DeserializeOwned>(&self, command: &str, params: Value) -> Result<T, AppError> {
        log::debug!("invoke {} {}", command, params);
        let envelope = self.gateway.invoke(command, params).await?;
        if let super::Envelope::Failure { error } = &envelope {
            log::warn!("{} failed: {}", command, error);
        }
        envelope.decode(command)
    }

    pub async fn load_configuration(&self) -> Result<Configuration, AppError> {
        self.call(LOAD_CONFIGURATION_COMMAND, json!({})).await
    }

    /// Fetches a block together with its immediate children.
    pub async fn get_block(&self, id: &BlockId) -> Result<Block, AppError> {
        self.call(GET_BLOCK_COMMAND, json!({ "blockId": id })).await
    }

    pub async fn create_block(&self, new_block: &NewBlock) -> Result<Block, AppError> {
        let params = serde_json::to_value(new_block).map_err(|source| AppError::Decode {
            command: CREATE_BLOCK_COMMAND.to_string(),
            source,
        })?;
        self.call(CREATE_BLOCK_COMMAND, params).await
    }

    pub async fn load_blocks_for_page(&self, page_id: &BlockId) -> Result<PageBlocks, AppError> {
        self.call(LOAD_BLOCKS_FOR_PAGE_COMMAND, json!({ "pageId": page_id }))
            .await
    }

    pub async fn change_block_order(
        &self,
        id: &BlockId,
        new_order: i32,
    ) -> Result<Block, AppError> {
        self.call(
            CHANGE_BLOCK_ORDER_COMMAND,
            json!({ "blockId": id, "newOrder": new_order }),
        )
        .await
    }

    pub async fn load_home_page(&self) -> Result<Block, AppError> {
        self.call(LOAD_HOME_PAGE_COMMAND, json!({})).await
    }

    /// Loads the configuration, then the workspace block it names.
    ///
    /// The second call only starts once the first has succeeded; either
    /// failure fails the whole operation with that step's error.
    pub async fn load_bootstrap(&self) -> Result<Bootstrap, AppError> {
        let configuration = self.load_configuration().await?;
        let workspace = self
            .get_block(&configuration.workspace_id.as_block())
            .await?;
        log::debug!(
            "Loaded configuration (workspace {}, {} children)",
            configuration.workspace_id,
            workspace.children.len()
        );
        Ok(Bootstrap {
            configuration,
            workspace,
        })
    }
}
