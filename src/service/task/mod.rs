pub mod lark;

use std::{ops::Deref, sync::Arc};

use async_trait::async_trait;
use tracing::{error, info, instrument};

use crate::{
    base::types::{Res, TaskCreationResult, TaskRequest},
    service::lark::LarkApiError,
};

/// Description every created task carries.
pub const TASK_DESCRIPTION: &str = "来自消息的任务 / Task from message";

/// Failure message for a command without a title.
pub const EMPTY_TITLE_MESSAGE: &str = "任务标题不能为空 / Task title cannot be empty";

// Traits.

/// Generic task service trait that clients must implement.
///
/// Implementations issue exactly one remote call per invocation and never retry.
#[async_trait]
pub trait GenericTaskClient: Send + Sync + 'static {
    /// Create a task, returning the identifier the remote service assigned to it.
    async fn create_task(&self, request: &TaskRequest) -> Res<String>;
}

// Structs.

/// Task client for the application.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct TaskClient {
    inner: Arc<dyn GenericTaskClient>,
}

impl Deref for TaskClient {
    type Target = dyn GenericTaskClient;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl TaskClient {
    pub fn new(inner: Arc<dyn GenericTaskClient>) -> Self {
        Self { inner }
    }

    /// Creates a task for a parsed command and folds any failure into the result.
    ///
    /// An empty title is rejected without a remote call.
    #[instrument(skip(self))]
    pub async fn create(&self, title: &str, message_id: Option<&str>, due_timestamp: Option<i64>, assignee_open_id: Option<&str>) -> TaskCreationResult {
        let title = title.trim();

        if title.is_empty() {
            return TaskCreationResult::failed(EMPTY_TITLE_MESSAGE);
        }

        let request = TaskRequest {
            title: title.to_string(),
            description: task_description(message_id),
            due_timestamp,
            assignee_open_id: assignee_open_id.map(str::to_string),
        };

        match self.create_task(&request).await {
            Ok(task_id) => {
                info!("Created task {} ...", task_id);
                TaskCreationResult::created(task_id)
            }
            Err(err) => {
                error!("Failed to create task: {:#}", err);
                TaskCreationResult::failed(failure_message(&err))
            }
        }
    }
}

/// Builds the task description, carrying the originating message ID when known.
pub fn task_description(message_id: Option<&str>) -> String {
    match message_id {
        Some(id) if !id.is_empty() => format!("{TASK_DESCRIPTION}\n消息ID / Message ID: {id}"),
        _ => TASK_DESCRIPTION.to_string(),
    }
}

/// The API's own message when the error came back as an error payload, the raw error text otherwise.
fn failure_message(err: &anyhow::Error) -> String {
    match err.downcast_ref::<LarkApiError>() {
        Some(api_err) if !api_err.msg.is_empty() => api_err.msg.clone(),
        _ => err.to_string(),
    }
}
