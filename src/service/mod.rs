//! Service integrations for external APIs and clients.
//!
//! This module contains implementations for the services used by the task-bot:
//! - Chat services (e.g., Lark messaging and event callbacks)
//! - Task services (e.g., Lark Task)
//! - The shared Lark open platform client both of them build on
//!
//! Each service module defines both a generic trait and a concrete implementation,
//! allowing for extensibility and easy testing.

pub mod chat;
pub mod lark;
pub mod task;
