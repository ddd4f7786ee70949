//! Handling of a received chat message, from text to reply.

use chrono::{TimeDelta, Utc};
use tracing::{Instrument, debug, error, info, instrument};

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Res, TaskCreationResult},
    },
    interaction::{
        assignee::resolve_assignee,
        command::{self, Command},
        reply::{UNSUPPORTED_MESSAGE_TYPE, dispatch_reply, format_reply, usage_hint},
    },
    service::{
        chat::ChatClient,
        task::{EMPTY_TITLE_MESSAGE, TaskClient},
    },
};

/// Handles a received message event.
///
/// Each event is processed on its own task; errors are logged there and never
/// reach the listener or other events.
#[instrument(skip_all)]
pub fn handle_message_event(message: InboundMessage, chat: ChatClient, task: TaskClient, config: Config) {
    tokio::spawn(
        async move {
            // Process the event.
            let result = process_message_event(message, &chat, &task, &config).await;

            // Log any errors.
            if let Err(err) = &result {
                error!("Error while handling: {:#}", err);
            }
        }
        .in_current_span(),
    );
}

/// Runs one message through parsing, task creation and reply.
///
/// Returns `None` when the message was not text or carried no command.
#[instrument(skip_all, fields(message_id = message.message_id.as_deref().unwrap_or_default()))]
pub async fn process_message_event(message: InboundMessage, chat: &ChatClient, task: &TaskClient, config: &Config) -> Res<Option<TaskCreationResult>> {
    let message_id = message.message_id.as_deref();
    let chat_id = message.chat_id.as_deref();

    // Only text messages carry commands; a missing type is read as text.

    if let Some(message_type) = message.message_type.as_deref().filter(|t| *t != "text") {
        if config.reply_with_usage_hint {
            dispatch_reply(chat, message_id, chat_id, UNSUPPORTED_MESSAGE_TYPE).await;
        } else {
            debug!("Ignoring `{}` message.", message_type);
        }

        return Ok(None);
    }

    // Find the command.

    let text = command::extract_text(&message.raw_content);
    let text = command::strip_mention_keys(&text, &message.mentions);

    let Some(command) = command::parse_command(&text) else {
        if config.reply_with_usage_hint {
            dispatch_reply(chat, message_id, chat_id, &usage_hint(text.trim())).await;
        } else {
            debug!("No command in message, ignoring.");
        }

        return Ok(None);
    };

    // Create the task.

    let (title, assignee, result) = match command {
        Command::MissingTitle => {
            info!("Command without a title ...");
            (String::new(), None, TaskCreationResult::failed(EMPTY_TITLE_MESSAGE))
        }
        Command::CreateTask { title } => {
            info!("Creating task ...");

            let bot_ids = [config.app_id.as_str(), chat.bot_user_id()];
            let assignee = resolve_assignee(&message.mentions, message.sender_open_id.as_deref(), &bot_ids);
            let due = due_timestamp(config.task_due_offset_hours)?;

            let result = task.create(&title, message_id, due, assignee.as_ref().map(|a| a.open_id.as_str())).await;

            (title, assignee, result)
        }
    };

    // Reply.

    let reply = format_reply(&result, &title, assignee.as_ref());
    dispatch_reply(chat, message_id, chat_id, &reply).await;

    Ok(Some(result))
}

/// Due time, in epoch seconds, `offset_hours` from now; `0` means no due time.
pub fn due_timestamp(offset_hours: u32) -> Res<Option<i64>> {
    if offset_hours == 0 {
        return Ok(None);
    }

    let offset = TimeDelta::try_hours(offset_hours.into()).ok_or_else(|| anyhow::anyhow!("Due offset of {} hours is out of range.", offset_hours))?;
    let due = Utc::now().checked_add_signed(offset).ok_or_else(|| anyhow::anyhow!("Due time is out of range."))?;

    Ok(Some(due.timestamp()))
}
