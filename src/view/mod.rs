// src/view/mod.rs
//! View composition: what the content view shows for a block id.
//!
//! Views are plain data built from a fetched block; [`render_view`] turns
//! them into text. There is no widget toolkit here.

mod form;
mod page;
mod render;

pub use form::{BlockForm, SubmitControl};
pub use page::{ChildView, ContentView, DebugPanel, PageView, ViewState};
pub use render::{render_page, render_view};
