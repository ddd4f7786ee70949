//! Choice of the user a created task is assigned to.

use crate::base::types::{Assignee, Mention};

/// Picks the assignee for a new task.
///
/// An explicit @-mention of someone other than the bot wins over the sender.
/// The sender is used only when nobody is mentioned at all; a message that
/// mentions nobody but the bot creates an unassigned task.
pub fn resolve_assignee(mentions: &[Mention], sender_open_id: Option<&str>, bot_ids: &[&str]) -> Option<Assignee> {
    if let Some(mention) = mentions.iter().find(|m| !m.open_id.is_empty() && !bot_ids.contains(&m.open_id.as_str())) {
        return Some(Assignee {
            open_id: mention.open_id.clone(),
            name: Some(mention.name.clone()).filter(|name| !name.is_empty()),
        });
    }

    if !mentions.is_empty() {
        return None;
    }

    sender_open_id.filter(|id| !id.is_empty()).map(|id| Assignee {
        open_id: id.to_string(),
        name: None,
    })
}
