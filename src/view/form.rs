// src/view/form.rs
//! The input form that appends children to the displayed block.

use crate::error::AppError;
use crate::model::{Block, BlockKind, NewBlock};
use crate::query::BlockQueries;
use crate::types::BlockId;

/// The two submit buttons; each fixes the type of the created block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitControl {
    /// "Insert Block"
    InsertBlock,
    /// "Create Page"
    CreatePage,
}

impl SubmitControl {
    pub fn kind(self) -> BlockKind {
        match self {
            SubmitControl::InsertBlock => BlockKind::Paragraph,
            SubmitControl::CreatePage => BlockKind::Page,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SubmitControl::InsertBlock => "Insert Block",
            SubmitControl::CreatePage => "Create Page",
        }
    }
}

/// Form state: the text being typed and the type to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockForm {
    parent_id: BlockId,
    content: String,
    block_type: BlockKind,
}

impl BlockForm {
    pub fn new(parent_id: BlockId) -> Self {
        Self {
            parent_id,
            content: String::new(),
            block_type: BlockKind::default(),
        }
    }

    pub fn parent_id(&self) -> &BlockId {
        &self.parent_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn block_type(&self) -> BlockKind {
        self.block_type
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    /// Pressing a control sets the type before the form submits.
    pub fn select(&mut self, control: SubmitControl) {
        self.block_type = control.kind();
    }

    /// The creation command for the current field values.
    pub fn to_new_block(&self) -> NewBlock {
        NewBlock {
            raw_data: self.content.clone(),
            block_type: self.block_type,
            parent_id: self.parent_id.clone(),
        }
    }

    /// Submits through `control`.
    ///
    /// On success the displayed blocks are invalidated and the content is
    /// cleared; on failure the content is left for another attempt. Empty
    /// content is sent as-is.
    pub async fn submit(
        &mut self,
        control: SubmitControl,
        queries: &BlockQueries,
    ) -> Result<Block, AppError> {
        self.select(control);
        let new_block = self.to_new_block();
        log::debug!("Submitting form {:?}", new_block);

        let created = queries.create_block(&new_block).await?;
        self.content.clear();
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_to_paragraph() {
        let form = BlockForm::new(BlockId::parse("P").unwrap());
        assert_eq!(form.block_type(), BlockKind::Paragraph);
        assert_eq!(form.content(), "");
    }

    #[test]
    fn controls_pick_the_type() {
        let mut form = BlockForm::new(BlockId::parse("P").unwrap());
        form.set_content("Projects");
        form.select(SubmitControl::CreatePage);

        let new_block = form.to_new_block();
        assert_eq!(new_block.block_type, BlockKind::Page);
        assert_eq!(new_block.raw_data, "Projects");
        assert_eq!(new_block.parent_id.as_str(), "P");

        form.select(SubmitControl::InsertBlock);
        assert_eq!(form.block_type(), BlockKind::Paragraph);
    }
}
