// src/app.rs
//! The application: navigation, the query cache and the content view
//! wired to one command gateway.

use crate::error::AppError;
use crate::gateway::{BlockCommands, CommandGateway};
use crate::model::Block;
use crate::navigation::{Navigator, Route};
use crate::query::{BlockQueries, QueryClient};
use crate::types::BlockId;
use crate::view::{
    render_view, BlockForm, ChildView, ContentView, PageView, SubmitControl, ViewState,
};
use std::sync::Arc;

pub type AppResult<T> = Result<T, Arc<AppError>>;

/// One user session over a backend.
#[derive(Debug)]
pub struct App {
    queries: BlockQueries,
    navigator: Navigator,
    content: ContentView,
    form: Option<BlockForm>,
}

impl App {
    /// Builds the session with a fresh cache of `cache_capacity` entries.
    pub fn new(gateway: Arc<dyn CommandGateway>, cache_capacity: usize) -> Self {
        let queries = BlockQueries::new(
            QueryClient::new(cache_capacity),
            BlockCommands::new(gateway),
        );
        Self::with_queries(queries)
    }

    pub fn with_queries(queries: BlockQueries) -> Self {
        Self {
            content: ContentView::new(queries.clone()),
            queries,
            navigator: Navigator::new(),
            form: None,
        }
    }

    pub fn queries(&self) -> &BlockQueries {
        &self.queries
    }

    pub fn route(&self) -> &Route {
        self.navigator.current()
    }

    /// The block the current route shows.
    ///
    /// The root route needs the configuration query first; page routes
    /// use their id directly.
    pub async fn target(&self) -> AppResult<BlockId> {
        match self.navigator.current() {
            Route::PageById(id) => Ok(id.clone()),
            Route::Root => {
                let bootstrap = self.queries.bootstrap().await?;
                Ok(self.navigator.target(&bootstrap))
            }
        }
    }

    /// Waits for the current route's content.
    pub async fn view(&self) -> ViewState {
        match self.target().await {
            Ok(id) => self.content.load(&id).await,
            Err(error) => {
                log::error!("Could not load the configuration: {}", error);
                ViewState::Failed(error)
            }
        }
    }

    /// The current route's content as text.
    pub async fn render(&self) -> String {
        render_view(&self.view().await)
    }

    /// Navigates to a path such as `/` or `/page/<id>`.
    pub fn open(&mut self, path: &str) -> Result<&Route, AppError> {
        let route = Route::parse(path)?;
        Ok(self.navigator.open(route))
    }

    pub fn home(&mut self) -> &Route {
        self.navigator.go_home()
    }

    pub fn back(&mut self) -> Option<&Route> {
        self.navigator.back()
    }

    /// Follows the link of the `n`-th child (1-based) of the current page.
    pub async fn follow(&mut self, n: usize) -> AppResult<Route> {
        let child = self.child_block(n).await?;
        let route = self.navigator.follow(&child)?.clone();
        Ok(route)
    }

    /// Appends a child to the current page through the input form.
    pub async fn add(&mut self, content: &str, control: SubmitControl) -> AppResult<Block> {
        let target = self.target().await?;
        let form = match self.form.take() {
            Some(form) if form.parent_id() == &target => form,
            _ => BlockForm::new(target),
        };
        let form = self.form.insert(form);
        form.set_content(content);
        Ok(form.submit(control, &self.queries).await?)
    }

    /// Moves the `n`-th child (1-based) to position `new_order`.
    pub async fn move_child(&mut self, n: usize, new_order: i32) -> AppResult<Block> {
        let child = self.child_block(n).await?;
        Ok(self
            .queries
            .change_block_order(&child.id, new_order)
            .await?)
    }

    /// The `n`-th child as numbered in the rendered view.
    async fn child_block(&self, n: usize) -> AppResult<Block> {
        let target = self.target().await?;
        let block = self.queries.displayed_block(&target).await?;
        let page = PageView::from_block(&block);
        let id = page
            .child(n)
            .map(ChildView::id)
            .ok_or_else(|| AppError::NoSuchChild {
                page: target.to_string(),
                index: n,
            })?;
        block
            .children
            .iter()
            .find(|child| &child.id == id)
            .cloned()
            .ok_or_else(|| Arc::new(AppError::Storage(format!("block not found: {}", id))))
    }
}
