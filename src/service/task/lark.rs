//! Lark Task v2 implementation of the task service.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::instrument;

use crate::{
    base::types::{Res, TaskRequest},
    service::lark::LarkApi,
};

use super::{GenericTaskClient, TaskClient};

// Extra methods on `TaskClient` applied by the lark implementation.

impl TaskClient {
    pub fn lark(api: LarkApi) -> Self {
        Self::new(Arc::new(LarkTaskClient::new(api)))
    }
}

// Wire types.

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct CreateTaskBody<'a> {
    summary: &'a str,
    description: &'a str,
    due: Option<TaskDue>,
    members: Option<Vec<TaskMember<'a>>>,
}

#[derive(Debug, Serialize)]
struct TaskDue {
    /// Milliseconds since the epoch, as a string.
    timestamp: String,
    is_all_day: bool,
}

#[derive(Debug, Serialize)]
struct TaskMember<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    role: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct CreateTaskData {
    task: Option<CreatedTask>,
}

#[derive(Debug, Default, Deserialize)]
struct CreatedTask {
    guid: Option<String>,
    task_id: Option<String>,
}

impl<'a> CreateTaskBody<'a> {
    fn from_request(request: &'a TaskRequest) -> Self {
        Self {
            summary: &request.title,
            description: &request.description,
            due: request.due_timestamp.map(|seconds| TaskDue {
                timestamp: (seconds * 1000).to_string(),
                is_all_day: false,
            }),
            members: request.assignee_open_id.as_deref().map(|id| vec![TaskMember { id, kind: "user", role: "assignee" }]),
        }
    }
}

// Specific implementations.

/// Lark task client implementation.
#[derive(Clone)]
pub struct LarkTaskClient {
    api: LarkApi,
}

impl LarkTaskClient {
    pub fn new(api: LarkApi) -> Self {
        Self { api }
    }
}

#[async_trait]
impl GenericTaskClient for LarkTaskClient {
    #[instrument(name = "LarkTaskClient::create_task", skip_all)]
    async fn create_task(&self, request: &TaskRequest) -> Res<String> {
        let body = CreateTaskBody::from_request(request);

        let data: CreateTaskData = self.api.post("/open-apis/task/v2/tasks", &[("user_id_type", "open_id")], &body).await?;

        data.task
            .and_then(|task| task.guid.or(task.task_id))
            .filter(|id| !id.is_empty())
            .ok_or_else(|| anyhow::anyhow!("Task created, but the response carried no task ID."))
    }
}

// Tests.
