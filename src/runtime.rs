//! Runtime services and shared state for the task-bot.

use tracing::instrument;

use crate::{
    base::{
        config::Config,
        types::{Res, Void},
    },
    service::{chat::ChatClient, lark::LarkApi, task::TaskClient},
};

/// Runtime service context that can be shared across the application.
///
/// This struct holds the chat client, task client, and configuration.
/// It is designed to be trivially cloneable, allowing it to be passed around
/// without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct Runtime {
    /// The configuration for the application.
    pub config: Config,
    /// The task client instance.
    pub task: TaskClient,
    /// The chat client instance.
    pub chat: ChatClient,
}

impl Runtime {
    /// Create a new runtime instance.
    #[instrument(skip_all)]
    pub async fn new(config: Config) -> Res<Self> {
        // Initialize the Lark API client shared by both services.
        let api = LarkApi::new(&config);

        // Initialize the task client.
        let task = TaskClient::lark(api.clone());

        // Initialize the chat client.
        let chat = ChatClient::lark(&config, api, task.clone()).await?;

        Ok(Self { config, task, chat })
    }

    pub async fn start(&self) -> Void {
        self.chat.start().await
    }
}
