//! Common types and result aliases.

/// Error type used throughout the crate.
pub type Err = anyhow::Error;
/// Result with the crate's error type.
pub type Res<T> = Result<T, Err>;
/// Result carrying nothing on success.
pub type Void = Res<()>;

/// A user reference embedded in a message.
///
/// The platform inlines `key` (e.g. `@_user_1`) into the message text where the
/// mention appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mention {
    /// Placeholder inlined into the text, e.g. `@_user_1`.
    pub key: String,
    /// Open ID of the mentioned user; empty when the platform did not provide one.
    pub open_id: String,
    /// Display name of the mentioned user.
    pub name: String,
}

/// A received chat message, reduced to what the bot acts on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InboundMessage {
    /// Message ID, used to reply in place.
    pub message_id: Option<String>,
    /// Chat the message was posted in.
    pub chat_id: Option<String>,
    /// `p2p` or `group`.
    pub chat_type: Option<String>,
    /// `text`, `post`, `image`, ...
    pub message_type: Option<String>,
    /// Open ID of the sender.
    pub sender_open_id: Option<String>,
    /// JSON-encoded payload, `{"text": "..."}` for text messages.
    pub raw_content: String,
    /// Mentioned users, in message order.
    pub mentions: Vec<Mention>,
}

/// The user a new task is assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignee {
    /// Open ID of the assignee.
    pub open_id: String,
    /// Only known when the assignee was picked from a mention.
    pub name: Option<String>,
}

/// A single create-task call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRequest {
    /// Task summary; never empty.
    pub title: String,
    /// Task description, pointing back at the originating message.
    pub description: String,
    /// Epoch seconds.
    pub due_timestamp: Option<i64>,
    /// Open ID of the assignee; unassigned when absent.
    pub assignee_open_id: Option<String>,
}

/// Outcome of a create-task attempt, used once to build the reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCreationResult {
    /// Whether the task was created.
    pub success: bool,
    /// Identifier the remote service assigned to the task.
    pub task_id: Option<String>,
    /// Failure detail; empty on success.
    pub message: String,
}

impl TaskCreationResult {
    /// A successful result.
    pub fn created(task_id: impl Into<String>) -> Self {
        Self {
            success: true,
            task_id: Some(task_id.into()),
            message: String::new(),
        }
    }

    /// A failed result with a human-readable reason.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            task_id: None,
            message: message.into(),
        }
    }
}
