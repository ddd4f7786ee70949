//! Event handling and user interactions for task-bot.
//!
//! This module provides functionality for handling received messages:
//! - Detecting the create-task command and its title
//! - Choosing the assignee from mentions and the sender
//! - Formatting and delivering the reply

pub mod assignee;
pub mod command;
pub mod message_event;
pub mod reply;
