// tests/common/mod.rs
//! A scripted backend that records every command it receives.

#![allow(dead_code)]

use myblocks::constants::{CREATE_BLOCK_COMMAND, GET_BLOCK_COMMAND, LOAD_CONFIGURATION_COMMAND};
use myblocks::{AppError, Block, BlockContents, BlockId, BlockType, CommandGateway, Envelope};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// In-memory blocks keyed by id, with scripted failures and a call log.
pub struct FakeBackend {
    workspace_id: String,
    blocks: Mutex<HashMap<String, Block>>,
    failures: Mutex<HashMap<String, String>>,
    raw_replies: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<(String, Value)>>,
    created: Mutex<usize>,
}

impl FakeBackend {
    pub fn new(workspace_id: &str) -> Arc<Self> {
        Arc::new(Self {
            workspace_id: workspace_id.to_string(),
            blocks: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            raw_replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            created: Mutex::new(0),
        })
    }

    /// Adds a block whose children are `(id, type, text)` triples.
    pub fn put(
        &self,
        id: &str,
        block_type: BlockType,
        text: &str,
        children: &[(&str, BlockType, &str)],
    ) {
        let mut parent = block(id, None, block_type, text);
        parent.children = children
            .iter()
            .map(|(child_id, child_type, child_text)| {
                block(child_id, Some(id), child_type.clone(), child_text)
            })
            .collect();
        self.blocks.lock().insert(id.to_string(), parent);
    }

    /// Makes `key` (a block id, or a command name) answer with a failure.
    pub fn fail(&self, key: &str, message: &str) {
        self.failures
            .lock()
            .insert(key.to_string(), message.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.failures.lock().remove(key);
        self.raw_replies.lock().remove(key);
    }

    /// Makes `command` answer with `raw` as-is, whatever its shape.
    pub fn reply_with(&self, command: &str, raw: Value) {
        self.raw_replies.lock().insert(command.to_string(), raw);
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn command_names(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(name, _)| name.clone()).collect()
    }

    /// Parameters of every call to `command`, in order.
    pub fn calls_to(&self, command: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(name, _)| name == command)
            .map(|(_, params)| params.clone())
            .collect()
    }

    fn failure_for(&self, key: &str) -> Option<Envelope> {
        self.failures.lock().get(key).map(Envelope::failure)
    }

    fn answer(&self, command: &str, params: &Value) -> Result<Envelope, AppError> {
        if let Some(failure) = self.failure_for(command) {
            return Ok(failure);
        }
        match command {
            LOAD_CONFIGURATION_COMMAND => {
                Ok(Envelope::encode(&json!({ "workspaceId": self.workspace_id })).unwrap())
            }
            GET_BLOCK_COMMAND => Ok(self.get_block(params)),
            CREATE_BLOCK_COMMAND => Ok(self.create_block(params)),
            other => Err(AppError::Transport(format!("unexpected command {}", other))),
        }
    }

    fn get_block(&self, params: &Value) -> Envelope {
        let id = params["blockId"].as_str().unwrap_or_default();
        if let Some(failure) = self.failure_for(id) {
            return failure;
        }
        match self.blocks.lock().get(id) {
            Some(block) => Envelope::encode(block).unwrap(),
            None => Envelope::failure(format!("block not found: {}", id)),
        }
    }

    fn create_block(&self, params: &Value) -> Envelope {
        let parent_id = params["parentId"].as_str().unwrap_or_default().to_string();
        let mut blocks = self.blocks.lock();
        let Some(parent) = blocks.get_mut(&parent_id) else {
            return Envelope::failure(format!("block not found: {}", parent_id));
        };

        let id = {
            let mut created = self.created.lock();
            *created += 1;
            format!("new-{}", created)
        };
        let block_type = match params["blockType"].as_str() {
            Some("page") => BlockType::Page,
            _ => BlockType::Text,
        };
        let child = block(
            &id,
            Some(&parent_id),
            block_type,
            params["rawData"].as_str().unwrap_or_default(),
        );
        parent.children.push(child.clone());
        let mut stored = child.clone();
        stored.children.clear();
        blocks.insert(id, stored);
        Envelope::encode(&child).unwrap()
    }
}

#[async_trait::async_trait]
impl CommandGateway for FakeBackend {
    async fn invoke(&self, command: &str, params: Value) -> Result<Envelope, AppError> {
        self.calls.lock().push((command.to_string(), params.clone()));
        // Suspend like a real round trip would.
        tokio::task::yield_now().await;

        let scripted = self.raw_replies.lock().get(command).cloned();
        let raw = match scripted {
            Some(raw) => raw,
            None => self.answer(command, &params)?.to_raw(),
        };
        Envelope::from_raw(command, raw)
    }
}

pub fn id(raw: &str) -> BlockId {
    BlockId::parse(raw).unwrap()
}

pub fn block(id_: &str, parent: Option<&str>, block_type: BlockType, text: &str) -> Block {
    let content_type = if block_type == BlockType::Page {
        "page"
    } else {
        "paragraph"
    };
    let mut block = Block::new(
        id(id_),
        parent.map(id),
        block_type,
        BlockContents::new(content_type, text),
    );
    block.created_at_utc = None;
    block.updated_at_utc = None;
    block
}
