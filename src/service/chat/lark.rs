//! Lark chat service integration for task-bot.
//!
//! This module provides functionality for interacting with Lark:
//! - Receiving event callbacks pushed by the platform
//! - Replying to messages and posting into chats
//!
//! The listener accepts the platform's JSON callbacks on one route, answers the
//! URL verification handshake, and hands received messages to the interaction
//! layer on their own tasks so the platform gets its acknowledgement right away.

use crate::{
    base::{
        config::Config,
        types::{InboundMessage, Mention, Res, Void},
    },
    interaction,
    service::{lark::LarkApi, task::TaskClient},
};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::skip_serializing_none;
use tracing::{debug, info, instrument, warn};

use std::sync::Arc;

use super::{ChatClient, GenericChatClient};

/// Event type of a received message.
const MESSAGE_RECEIVE_EVENT: &str = "im.message.receive_v1";

// Extra methods on `ChatClient` applied by the lark implementation.

impl ChatClient {
    /// Creates a new Lark chat client.
    pub async fn lark(config: &Config, api: LarkApi, task: TaskClient) -> Res<Self> {
        let client = LarkChatClient::new(config, api, task).await?;
        Ok(Self::new(Arc::new(client)))
    }
}

impl From<LarkChatClient> for ChatClient {
    fn from(client: LarkChatClient) -> Self {
        Self::new(Arc::new(client))
    }
}

// Wire types.

/// A schema 2.0 event callback.
#[derive(Debug, Deserialize)]
struct EventEnvelope {
    header: EventHeader,
    #[serde(default)]
    event: Value,
}

#[derive(Debug, Deserialize)]
struct EventHeader {
    #[serde(default)]
    event_id: Option<String>,
    event_type: String,
    #[serde(default)]
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct UserId {
    #[serde(default)]
    open_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageReceiveEvent {
    #[serde(default)]
    sender: Option<EventSender>,
    message: EventMessage,
}

#[derive(Debug, Deserialize)]
struct EventSender {
    #[serde(default)]
    sender_id: Option<UserId>,
    #[serde(default)]
    sender_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    #[serde(default)]
    message_id: Option<String>,
    #[serde(default)]
    chat_id: Option<String>,
    #[serde(default)]
    chat_type: Option<String>,
    #[serde(default)]
    message_type: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    mentions: Option<Vec<EventMention>>,
}

#[derive(Debug, Deserialize)]
struct EventMention {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    id: Option<UserId>,
    #[serde(default)]
    name: Option<String>,
}

impl From<MessageReceiveEvent> for InboundMessage {
    fn from(event: MessageReceiveEvent) -> Self {
        let message = event.message;

        Self {
            message_id: message.message_id,
            chat_id: message.chat_id,
            chat_type: message.chat_type,
            message_type: message.message_type,
            sender_open_id: event.sender.and_then(|s| s.sender_id).and_then(|id| id.open_id),
            raw_content: message.content.unwrap_or_default(),
            mentions: message
                .mentions
                .unwrap_or_default()
                .into_iter()
                .map(|m| Mention {
                    key: m.key.unwrap_or_default(),
                    open_id: m.id.and_then(|id| id.open_id).unwrap_or_default(),
                    name: m.name.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

/// Body of the send and reply message calls.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct MessageBody<'a> {
    receive_id: Option<&'a str>,
    msg_type: &'a str,
    /// JSON-encoded `{"text": ...}`.
    content: String,
}

impl<'a> MessageBody<'a> {
    fn text(receive_id: Option<&'a str>, text: &str) -> Res<Self> {
        Ok(Self {
            receive_id,
            msg_type: "text",
            content: serde_json::to_string(&json!({ "text": text }))?,
        })
    }
}

/// What to do with an incoming callback body.
#[derive(Debug)]
enum Callback {
    /// URL verification handshake: echo the challenge.
    Challenge(String),
    /// An event to dispatch.
    Event(EventEnvelope),
    /// Refuse the callback.
    Rejected(StatusCode, &'static str),
}

// Structs.

/// State shared with the callback route.
#[derive(Clone)]
struct LarkListenerState {
    config: Config,
    chat: ChatClient,
    task: TaskClient,
}

/// Lark chat client implementation.
#[derive(Clone)]
pub struct LarkChatClient {
    config: Config,
    api: LarkApi,
    bot_user_id: String,
    task: TaskClient,
}

impl LarkChatClient {
    /// Create a new Lark chat client.
    #[instrument(name = "LarkChatClient::new", skip_all)]
    pub async fn new(config: &Config, api: LarkApi, task: TaskClient) -> Res<Self> {
        // Get the bot's open ID.

        let bot_user_id = api.bot_open_id().await?;

        Ok(Self {
            config: config.clone(),
            api,
            bot_user_id,
            task,
        })
    }
}

#[async_trait]
impl GenericChatClient for LarkChatClient {
    fn bot_user_id(&self) -> &str {
        &self.bot_user_id
    }

    async fn start(&self) -> Void {
        let state = LarkListenerState {
            config: self.config.clone(),
            chat: ChatClient::from(self.clone()),
            task: self.task.clone(),
        };

        let listener = tokio::net::TcpListener::bind(&self.config.listen_address).await?;

        info!("Listening for Lark events on {}{} ...", listener.local_addr()?, self.config.event_path);

        // Serve until Ctrl-C.
        axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn reply_message(&self, message_id: &str, text: &str) -> Void {
        let body = MessageBody::text(None, text)?;
        let path = format!("/open-apis/im/v1/messages/{message_id}/reply");

        let _: Value = self.api.post(&path, &[], &body).await.map_err(|e| anyhow::anyhow!("Failed to reply to message: {:#}", e))?;

        Ok(())
    }

    #[instrument(skip(self, text))]
    async fn send_message(&self, chat_id: &str, text: &str) -> Void {
        let body = MessageBody::text(Some(chat_id), text)?;

        let _: Value = self
            .api
            .post("/open-apis/im/v1/messages", &[("receive_id_type", "chat_id")], &body)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to send message: {:#}", e))?;

        Ok(())
    }
}

// Event listener.

fn router(state: LarkListenerState) -> Router {
    let path = state.config.event_path.clone();

    Router::new().route(&path, post(handle_callback)).with_state(state)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", err);
        std::future::pending::<()>().await;
    }

    info!("Shutting down ...");
}

/// Handles a callback pushed by the platform.
#[instrument(skip_all)]
async fn handle_callback(State(state): State<LarkListenerState>, Json(body): Json<Value>) -> Response {
    match classify_callback(body, state.config.verification_token.as_deref().filter(|token| !token.is_empty())) {
        Callback::Challenge(challenge) => {
            info!("Answering URL verification ...");
            Json(json!({ "challenge": challenge })).into_response()
        }
        Callback::Event(envelope) => {
            dispatch_event(envelope, &state);
            Json(json!({})).into_response()
        }
        Callback::Rejected(status, reason) => {
            warn!("Rejected callback: {}", reason);
            (status, reason).into_response()
        }
    }
}

/// Sorts a callback body into a handshake, an event, or a rejection.
fn classify_callback(body: Value, verification_token: Option<&str>) -> Callback {
    if body.get("encrypt").is_some() {
        return Callback::Rejected(StatusCode::BAD_REQUEST, "Encrypted callbacks are not supported; remove the encrypt key from the event subscription.");
    }

    if body.get("type").and_then(Value::as_str) == Some("url_verification") {
        if !token_matches(verification_token, body.get("token").and_then(Value::as_str)) {
            return Callback::Rejected(StatusCode::UNAUTHORIZED, "Verification token mismatch.");
        }

        return match body.get("challenge").and_then(Value::as_str) {
            Some(challenge) => Callback::Challenge(challenge.to_string()),
            None => Callback::Rejected(StatusCode::BAD_REQUEST, "URL verification without a challenge."),
        };
    }

    let Ok(envelope) = serde_json::from_value::<EventEnvelope>(body) else {
        return Callback::Rejected(StatusCode::BAD_REQUEST, "Unrecognized callback body.");
    };

    if !token_matches(verification_token, envelope.header.token.as_deref()) {
        return Callback::Rejected(StatusCode::UNAUTHORIZED, "Verification token mismatch.");
    }

    Callback::Event(envelope)
}

fn token_matches(expected: Option<&str>, actual: Option<&str>) -> bool {
    expected.is_none_or(|expected| actual == Some(expected))
}

/// Routes an event to its handler by event type.
fn dispatch_event(envelope: EventEnvelope, state: &LarkListenerState) {
    let event_id = envelope.header.event_id.as_deref().unwrap_or_default();

    match envelope.header.event_type.as_str() {
        MESSAGE_RECEIVE_EVENT => {
            info!("Received message event {} ...", event_id);

            let event = match serde_json::from_value::<MessageReceiveEvent>(envelope.event) {
                Ok(event) => event,
                Err(err) => {
                    warn!("Skipping malformed message event: {}", err);
                    return;
                }
            };

            // Messages sent by apps (including this one) never carry commands for us.
            if event.sender.as_ref().and_then(|s| s.sender_type.as_deref()) == Some("app") {
                debug!("Skipping message event because it was sent by an app.");
                return;
            }

            interaction::message_event::handle_message_event(event.into(), state.chat.clone(), state.task.clone(), state.config.clone());
        }
        other => {
            warn!("Received unhandled event `{}`.", other);
        }
    }
}

// Tests.
