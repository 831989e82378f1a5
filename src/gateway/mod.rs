// src/gateway/mod.rs
//! The command boundary, the only way to reach block storage.
//!
//! Everything behind [`CommandGateway`] is opaque: a command name and a
//! JSON parameter object go in, an [`Envelope`] comes out. Payloads are
//! decoded into typed models right here, so untyped data never leaves
//! this module.

mod commands;
mod envelope;

pub use commands::BlockCommands;
pub use envelope::Envelope;

use crate::error::AppError;
use serde_json::Value;

/// The ability to invoke a named command on the backend.
///
/// This is the single asynchronous invocation primitive. Implementations
/// must not retry or time out; an `Err` means the call itself could not be
/// made, a backend-reported failure is an `Ok(Envelope::Failure)`.
#[async_trait::async_trait]
pub trait CommandGateway: Send + Sync {
    async fn invoke(&self, command: &str, params: Value) -> Result<Envelope, AppError>;
}

#[async_trait::async_trait]
impl<G: CommandGateway + ?Sized> CommandGateway for std::sync::Arc<G> {
    async fn invoke(&self, command: &str, params: Value) -> Result<Envelope, AppError> {
        (**self).invoke(command, params).await
    }
}
