// src/query/queries.rs
//! The block queries and the one mutation, expressed over the cache.

use super::{QueryClient, QueryKey, QueryState};
use crate::error::AppError;
use crate::gateway::BlockCommands;
use crate::model::{Block, Bootstrap, NewBlock};
use crate::types::BlockId;
use std::sync::Arc;

/// Cached access to blocks and the bootstrap configuration.
#[derive(Debug, Clone)]
pub struct BlockQueries {
    client: QueryClient,
    commands: BlockCommands,
}

impl BlockQueries {
    pub fn new(client: QueryClient, commands: BlockCommands) -> Self {
        Self { client, commands }
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn commands(&self) -> &BlockCommands {
        &self.commands
    }

    /// `["loadConfiguration"]`: configuration, then the workspace block.
    pub async fn bootstrap(&self) -> Result<Arc<Bootstrap>, Arc<AppError>> {
        let commands = self.commands.clone();
        self.client
            .fetch(QueryKey::load_configuration(), move || async move {
                commands.load_bootstrap().await
            })
            .await
    }

    /// `["displayedBlock", {id}]`: the block with its children.
    pub async fn displayed_block(&self, id: &BlockId) -> Result<Arc<Block>, Arc<AppError>> {
        let commands = self.commands.clone();
        let block_id = id.clone();
        self.client
            .fetch(QueryKey::displayed_block(id), move || async move {
                log::debug!("Trying to load block page {}", block_id);
                commands.get_block(&block_id).await
            })
            .await
    }

    /// Non-blocking read of a displayed block.
    pub fn poll_displayed_block(&self, id: &BlockId) -> QueryState<Block> {
        let commands = self.commands.clone();
        let block_id = id.clone();
        self.client
            .query(QueryKey::displayed_block(id), move || async move {
                commands.get_block(&block_id).await
            })
    }

    /// Creates a block, then invalidates every displayed block so the
    /// parent's view refetches. Nothing is inserted optimistically.
    pub async fn create_block(&self, new_block: &NewBlock) -> Result<Block, AppError> {
        let created = self.commands.create_block(new_block).await?;
        log::info!(
            "Created {} block {} under {}",
            created.block_type,
            created.id,
            new_block.parent_id
        );
        self.client.invalidate(&QueryKey::displayed_block_family());
        Ok(created)
    }

    /// Moves a block among its siblings and invalidates displayed blocks.
    pub async fn change_block_order(
        &self,
        id: &BlockId,
        new_order: i32,
    ) -> Result<Block, AppError> {
        let moved = self.commands.change_block_order(id, new_order).await?;
        self.client.invalidate(&QueryKey::displayed_block_family());
        Ok(moved)
    }
}
