//! Library root for `task-bot`.
//!
//! Task-bot is a Lark chat bot that turns messages into tasks:
//! - Detects `创建任务: <title>` / `create task: <title>` in received messages
//! - Assigns the task to the first @-mentioned user, or to the sender
//! - Creates the task through the Lark Task API
//! - Replies in the chat with the outcome
//!
//! The bot integrates with Lark for both chat and tasks. The architecture is
//! built around traits that allow for different implementations of each service.

#[deny(missing_docs)]
pub mod base;
pub mod interaction;
pub mod runtime;
pub mod service;

use base::{config::Config, types::Void};
use tracing::info;

/// Public async entry for the binary crate.
///
/// Sets up necessary services and starts the task-bot runtime:
/// - Creates the runtime context with the task and chat clients
/// - Starts the event listener for processing messages
pub async fn start(config: Config) -> Void {
    info!("Starting task-bot ...");

    // Initialize the runtime.
    let runtime = runtime::Runtime::new(config).await?;

    // Start the runtime.
    runtime.start().await?;

    Ok(())
}
