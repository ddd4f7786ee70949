//! Detection of the `create task:` command in message text.

use serde_json::Value;

use crate::base::types::Mention;

/// Markers that start a command, and whether they match ASCII-case-insensitively.
const MARKERS: &[(&str, bool)] = &[("创建任务:", false), ("创建任务：", false), ("create task:", true)];

/// A command found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create a task with this (trimmed, non-empty) title.
    CreateTask { title: String },
    /// A marker was present, but nothing followed it.
    MissingTitle,
}

/// Returns the `text` of a `{"text": "..."}` payload, or the raw content itself when it is not one.
pub fn extract_text(raw_content: &str) -> String {
    serde_json::from_str::<Value>(raw_content)
        .ok()
        .and_then(|value| value.get("text").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| raw_content.to_string())
}

/// Removes the mention placeholders (`@_user_1`, ...) the platform inlines into the text.
pub fn strip_mention_keys(text: &str, mentions: &[Mention]) -> String {
    let mut keys: Vec<&str> = mentions.iter().map(|m| m.key.as_str()).filter(|k| !k.is_empty()).collect();

    // `@_user_10` must go before `@_user_1`.
    keys.sort_by_key(|k| std::cmp::Reverse(k.len()));

    keys.into_iter().fold(text.to_string(), |text, key| text.replace(key, ""))
}

/// Finds the earliest command marker in `text` and returns what follows it.
///
/// Returns `None` when the text carries no marker.
pub fn parse_command(text: &str) -> Option<Command> {
    let (start, marker) = MARKERS
        .iter()
        .filter_map(|&(marker, ignore_case)| find_marker(text, marker, ignore_case).map(|start| (start, marker)))
        .min_by_key(|&(start, _)| start)?;

    let title = text[start + marker.len()..].trim();

    if title.is_empty() {
        Some(Command::MissingTitle)
    } else {
        Some(Command::CreateTask { title: title.to_string() })
    }
}

fn find_marker(text: &str, marker: &str, ignore_ascii_case: bool) -> Option<usize> {
    if !ignore_ascii_case {
        return text.find(marker);
    }

    // ASCII-only comparison keeps byte offsets valid; `to_lowercase` can change them.
    let bytes = text.as_bytes();
    text.char_indices()
        .map(|(i, _)| i)
        .find(|&i| bytes.len() - i >= marker.len() && bytes[i..i + marker.len()].eq_ignore_ascii_case(marker.as_bytes()))
}
