#![cfg(test)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockall::mock;
use task_bot::{
    base::{
        config::{Config, ConfigInner},
        types::{InboundMessage, Mention, Res, TaskRequest, Void},
    },
    interaction::{
        message_event::process_message_event,
        reply::{FAILURE_INDICATOR, SUCCESS_INDICATOR, UNSUPPORTED_MESSAGE_TYPE},
    },
    service::{
        chat::{ChatClient, GenericChatClient},
        lark::LarkApiError,
        task::{EMPTY_TITLE_MESSAGE, GenericTaskClient, TaskClient},
    },
};

// Mocks.

mock! {
    pub Chat {}

    #[async_trait]
    impl GenericChatClient for Chat {
        fn bot_user_id(&self) -> &str;
        async fn start(&self) -> Void;
        async fn reply_message(&self, message_id: &str, text: &str) -> Void;
        async fn send_message(&self, chat_id: &str, text: &str) -> Void;
    }
}

mock! {
    pub Task {}

    #[async_trait]
    impl GenericTaskClient for Task {
        async fn create_task(&self, request: &TaskRequest) -> Res<String>;
    }
}

type Sent = Arc<Mutex<Vec<(String, String)>>>;
type Created = Arc<Mutex<Vec<TaskRequest>>>;

/// A chat mock that records replies and posts; `fail` makes every send fail.
fn get_mock_chat(fail: bool) -> (MockChat, Sent, Sent) {
    let replies: Sent = Arc::default();
    let posts: Sent = Arc::default();

    let mut mock = MockChat::new();

    mock.expect_bot_user_id().return_const("ou_bot".to_string());

    let recorder = replies.clone();
    mock.expect_reply_message().returning(move |message_id, text| {
        recorder.lock().unwrap().push((message_id.to_string(), text.to_string()));
        if fail { Err(anyhow::anyhow!("network unreachable")) } else { Ok(()) }
    });

    let recorder = posts.clone();
    mock.expect_send_message().returning(move |chat_id, text| {
        recorder.lock().unwrap().push((chat_id.to_string(), text.to_string()));
        if fail { Err(anyhow::anyhow!("network unreachable")) } else { Ok(()) }
    });

    (mock, replies, posts)
}

/// A task mock that records requests and answers with `outcome`.
fn get_mock_task(outcome: fn() -> Res<String>) -> (MockTask, Created) {
    let created: Created = Arc::default();
    let recorder = created.clone();

    let mut mock = MockTask::new();
    mock.expect_create_task().returning(move |request| {
        recorder.lock().unwrap().push(request.clone());
        outcome()
    });

    (mock, created)
}

fn test_config(reply_with_usage_hint: bool) -> Config {
    Config::from(ConfigInner {
        app_id: "cli_app".to_string(),
        app_secret: "secret".to_string(),
        base_domain: "https://open.feishu.cn".to_string(),
        listen_address: "127.0.0.1:0".to_string(),
        event_path: "/webhook/event".to_string(),
        task_due_offset_hours: 24,
        reply_with_usage_hint,
        ..Default::default()
    })
}

fn text_message(text: &str, sender: Option<&str>, mentions: Vec<Mention>) -> InboundMessage {
    InboundMessage {
        message_id: Some("om_1".to_string()),
        chat_id: Some("oc_1".to_string()),
        chat_type: Some("group".to_string()),
        message_type: Some("text".to_string()),
        sender_open_id: sender.map(str::to_string),
        raw_content: serde_json::json!({ "text": text }).to_string(),
        mentions,
    }
}

fn mention(key: &str, open_id: &str, name: &str) -> Mention {
    Mention {
        key: key.to_string(),
        open_id: open_id.to_string(),
        name: name.to_string(),
    }
}

// Tests.

#[tokio::test]
async fn test_localized_command_assigns_sender() {
    let (chat, replies, _) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("创建任务: 写周报", Some("U1"), vec![]), &chat, &task, &test_config(false)).await.unwrap().unwrap();

    assert!(result.success);
    assert_eq!(result.task_id.as_deref(), Some("T1"));

    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].title, "写周报");
    assert_eq!(created[0].assignee_open_id.as_deref(), Some("U1"));
    assert!(created[0].description.contains("om_1"));
    assert!(created[0].due_timestamp.is_some());

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].0, "om_1");
    assert!(replies[0].1.starts_with(SUCCESS_INDICATOR));
    assert!(replies[0].1.contains("写周报"));
}

#[tokio::test]
async fn test_empty_title_replies_without_remote_call() {
    let (chat, replies, _) = get_mock_chat(false);
    let mut task = MockTask::new();
    task.expect_create_task().times(0);

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("create task:  ", Some("U1"), vec![]), &chat, &task, &test_config(false)).await.unwrap().unwrap();

    assert!(!result.success);

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1.starts_with(FAILURE_INDICATOR));
    assert!(replies[0].1.contains(EMPTY_TITLE_MESSAGE));
}

#[tokio::test]
async fn test_message_without_command_is_ignored() {
    let mut chat = MockChat::new();
    chat.expect_bot_user_id().return_const("ou_bot".to_string());
    chat.expect_reply_message().times(0);
    chat.expect_send_message().times(0);

    let mut task = MockTask::new();
    task.expect_create_task().times(0);

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("good morning", Some("U1"), vec![]), &chat, &task, &test_config(false)).await.unwrap();

    assert!(result.is_none());
}

#[tokio::test]
async fn test_usage_hint_when_enabled() {
    let (chat, replies, _) = get_mock_chat(false);
    let mut task = MockTask::new();
    task.expect_create_task().times(0);

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("good morning", Some("U1"), vec![]), &chat, &task, &test_config(true)).await.unwrap();

    assert!(result.is_none());

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].1.contains("good morning"));
    assert!(replies[0].1.contains("create task: [task title]"));
}

#[tokio::test]
async fn test_mentioned_user_is_assigned() {
    let (chat, replies, _) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let message = text_message(
        "@_user_1 create task: review @_user_2",
        Some("U1"),
        vec![mention("@_user_1", "ou_bot", "Task Bot"), mention("@_user_2", "ou_alice", "Alice")],
    );

    process_message_event(message, &chat, &task, &test_config(false)).await.unwrap();

    let created = created.lock().unwrap();
    assert_eq!(created[0].title, "review");
    assert_eq!(created[0].assignee_open_id.as_deref(), Some("ou_alice"));

    let replies = replies.lock().unwrap();
    assert!(replies[0].1.contains("review"));
    assert!(replies[0].1.contains("Alice"));
}

#[tokio::test]
async fn test_only_bot_mentioned_creates_unassigned_task() {
    let (chat, _, _) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let message = text_message("@_user_1 创建任务: 写周报", Some("U1"), vec![mention("@_user_1", "ou_bot", "Task Bot")]);

    process_message_event(message, &chat, &task, &test_config(false)).await.unwrap();

    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].assignee_open_id, None);
}

#[tokio::test]
async fn test_api_error_is_reported_without_retry() {
    let (chat, replies, _) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| {
        Err(LarkApiError {
            code: 1470403,
            msg: "no permission to create task".to_string(),
        }
        .into())
    });

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("create task: ship it", Some("U1"), vec![]), &chat, &task, &test_config(false)).await.unwrap().unwrap();

    assert!(!result.success);
    assert_eq!(created.lock().unwrap().len(), 1);

    let replies = replies.lock().unwrap();
    assert!(replies[0].1.starts_with(FAILURE_INDICATOR));
    assert!(replies[0].1.contains("no permission to create task"));
}

#[tokio::test]
async fn test_unparseable_content_is_read_as_plain_text() {
    let (chat, _, _) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let mut message = text_message("", Some("U1"), vec![]);
    message.raw_content = "Create Task: plain text".to_string();

    process_message_event(message, &chat, &task, &test_config(false)).await.unwrap();

    assert_eq!(created.lock().unwrap()[0].title, "plain text");
}

#[tokio::test]
async fn test_reply_falls_back_to_chat() {
    let (chat, replies, posts) = get_mock_chat(false);
    let (task, _) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let mut message = text_message("create task: post it", Some("U1"), vec![]);
    message.message_id = None;

    process_message_event(message, &chat, &task, &test_config(false)).await.unwrap();

    assert!(replies.lock().unwrap().is_empty());

    let posts = posts.lock().unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "oc_1");
}

#[tokio::test]
async fn test_no_reply_target_still_creates_task() {
    let (chat, replies, posts) = get_mock_chat(false);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let mut message = text_message("create task: orphan", Some("U1"), vec![]);
    message.message_id = None;
    message.chat_id = None;

    let result = process_message_event(message, &chat, &task, &test_config(false)).await.unwrap().unwrap();

    assert!(result.success);
    assert_eq!(created.lock().unwrap().len(), 1);
    assert!(replies.lock().unwrap().is_empty());
    assert!(posts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_reply_failure_keeps_created_task() {
    let (chat, replies, _) = get_mock_chat(true);
    let (task, created) = get_mock_task(|| Ok("T1".to_string()));

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let result = process_message_event(text_message("create task: keep me", Some("U1"), vec![]), &chat, &task, &test_config(false)).await.unwrap().unwrap();

    assert!(result.success);
    assert_eq!(created.lock().unwrap().len(), 1);
    assert_eq!(replies.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_and_post_messages_are_ignored() {
    let mut chat = MockChat::new();
    chat.expect_bot_user_id().return_const("ou_bot".to_string());
    chat.expect_reply_message().times(0);
    chat.expect_send_message().times(0);

    let mut task = MockTask::new();
    task.expect_create_task().times(0);

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let mut file = text_message("", Some("U1"), vec![]);
    file.message_type = Some("file".to_string());
    file.raw_content = serde_json::json!({ "file_key": "f1", "file_name": "create task: budget.xlsx" }).to_string();

    let mut post = text_message("", Some("U1"), vec![]);
    post.message_type = Some("post".to_string());
    post.raw_content = serde_json::json!({ "title": "", "content": [[{ "tag": "text", "text": "create task: ship it" }]] }).to_string();

    assert!(process_message_event(file, &chat, &task, &test_config(false)).await.unwrap().is_none());
    assert!(process_message_event(post, &chat, &task, &test_config(false)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_non_text_message_gets_hint_when_enabled() {
    let (chat, replies, _) = get_mock_chat(false);
    let mut task = MockTask::new();
    task.expect_create_task().times(0);

    let chat = ChatClient::new(Arc::new(chat));
    let task = TaskClient::new(Arc::new(task));

    let mut message = text_message("", Some("U1"), vec![]);
    message.message_type = Some("file".to_string());
    message.raw_content = serde_json::json!({ "file_key": "f1", "file_name": "create task: budget.xlsx" }).to_string();

    let result = process_message_event(message, &chat, &task, &test_config(true)).await.unwrap();

    assert!(result.is_none());

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].1, UNSUPPORTED_MESSAGE_TYPE);
}
