// src/view/render.rs
//! Text rendering of the content view.

use super::form::SubmitControl;
use super::page::{ChildView, DebugPanel, PageView, ViewState};
use std::fmt::Write;

/// Renders whatever the view currently holds.
///
/// A loading view renders nothing; a failed one renders its error message.
pub fn render_view(state: &ViewState) -> String {
    match state {
        ViewState::Loading => String::new(),
        ViewState::Ready(page) => render_page(page),
        ViewState::Failed(error) => format!("error: {}\n", error),
    }
}

/// Renders a resolved page: header, numbered children, form, debug panel.
pub fn render_page(page: &PageView) -> String {
    let mut output = String::with_capacity(64 * (page.children.len() + 8));

    let _ = writeln!(output, "# {}", page.header);
    output.push('\n');

    for (index, child) in page.children.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", index + 1, render_child(child));
    }
    if !page.children.is_empty() {
        output.push('\n');
    }

    let _ = writeln!(
        output,
        "[{}] [{}] > {}",
        SubmitControl::InsertBlock.label(),
        SubmitControl::CreatePage.label(),
        page.form.content()
    );
    output.push('\n');

    render_debug(&mut output, &page.debug);
    output
}

fn render_child(child: &ChildView) -> String {
    match child {
        ChildView::Link { title, route, .. } => format!("[{}]({})", title, route),
        ChildView::Text { text, .. } => text.clone(),
        ChildView::Other {
            block_type, text, ..
        } => format!("({}) {}", block_type, text),
    }
}

fn render_debug(output: &mut String, debug: &DebugPanel) {
    let _ = writeln!(output, "Block ID: {}", debug.id);
    let _ = writeln!(output, "Block Type: {}", debug.block_type);
    let _ = writeln!(output, "Block contents: {}", debug.contents);
    let _ = writeln!(
        output,
        "Parent ID: {}",
        debug.parent_id.as_deref().unwrap_or_default()
    );
}
