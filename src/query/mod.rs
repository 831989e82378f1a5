// src/query/mod.rs
//! Query/cache layer: shares fetch results between views.
//!
//! [`QueryClient`] is the generic cache; [`BlockQueries`] binds it to the
//! block commands with the keys every view agrees on.

mod client;
mod key;
mod queries;

pub use client::{QueryClient, QueryEvent, QueryState};
pub use key::{KeySegment, QueryKey};
pub use queries::BlockQueries;
