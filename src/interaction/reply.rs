//! Composition and delivery of the bot's answer.

use tracing::{error, info, instrument, warn};

use crate::{
    base::types::{Assignee, TaskCreationResult},
    service::chat::ChatClient,
};

/// Prefix of every success reply.
pub const SUCCESS_INDICATOR: &str = "✅ 任务创建成功 / Task created successfully";

/// Prefix of every failure reply.
pub const FAILURE_INDICATOR: &str = "❌ 创建任务失败 / Failed to create task";

/// Text sent for non-text messages, when usage hints are enabled.
pub const UNSUPPORTED_MESSAGE_TYPE: &str = "只支持文本消息 / Only text messages are supported";

/// Text sent for messages without a command, when usage hints are enabled.
pub fn usage_hint(text: &str) -> String {
    format!("收到消息: {text}\n\n💡 提示: 发送 \"创建任务: [任务标题]\" 来创建任务\nTip: Send \"create task: [task title]\" to create a task")
}

/// Formats the reply for a create-task attempt.
pub fn format_reply(result: &TaskCreationResult, title: &str, assignee: Option<&Assignee>) -> String {
    if !result.success {
        return format!("{FAILURE_INDICATOR}: {}", result.message);
    }

    let mut reply = format!("{SUCCESS_INDICATOR}\n任务 / Task: {title}");

    if let Some(assignee) = assignee {
        let who = match &assignee.name {
            Some(name) => name.clone(),
            None => format!("<at user_id=\"{}\"></at>", assignee.open_id),
        };

        reply.push_str(&format!("\n负责人 / Assignee: {who}"));
    }

    if let Some(task_id) = &result.task_id {
        reply.push_str(&format!("\n任务ID / Task ID: {task_id}"));
    }

    reply
}

/// Sends `text` back to where the message came from.
///
/// Replies to the message itself when its ID is known, posts into the chat otherwise.
/// Failures are logged and swallowed: a task that was already created stays created.
#[instrument(skip(chat, text))]
pub async fn dispatch_reply(chat: &ChatClient, message_id: Option<&str>, chat_id: Option<&str>, text: &str) {
    let result = match (message_id.filter(|id| !id.is_empty()), chat_id.filter(|id| !id.is_empty())) {
        (Some(message_id), _) => {
            info!("Replying to message ...");
            chat.reply_message(message_id, text).await
        }
        (None, Some(chat_id)) => {
            info!("Sending message to chat ...");
            chat.send_message(chat_id, text).await
        }
        (None, None) => {
            warn!("No reply target: the event carried neither a message ID nor a chat ID.");
            return;
        }
    };

    if let Err(err) = result {
        error!("Failed to send reply: {:#}", err);
    }
}
