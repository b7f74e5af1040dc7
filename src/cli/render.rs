//! Plain-text formatting for terminal output.

use crate::admin::model_usage_rows;
use crate::api::{AdminStats, Profile};
use crate::core::conversation::Conversation;
use crate::core::message::Message;
use crate::core::models::{ModelTier, MODELS};
use crate::core::session::AuthPrompt;
use serde_json::Value;

const PREVIEW_CHARS: usize = 40;

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = single_line.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn format_message(message: &Message) -> String {
    if message.is_user() {
        format!("You: {}", message.content)
    } else if message.error {
        format!("⚠️  {}", message.content)
    } else {
        message.content.clone()
    }
}

pub fn conversation_lines(conversations: &[Conversation], active_id: Option<&str>) -> Vec<String> {
    conversations
        .iter()
        .enumerate()
        .map(|(index, conversation)| {
            let marker = if Some(conversation.id.as_str()) == active_id {
                '*'
            } else {
                ' '
            };
            format!(
                "{marker} {:>2}. {}  ({} messages) {}",
                index + 1,
                conversation.title,
                conversation.len(),
                truncate(&conversation.last_message, PREVIEW_CHARS)
            )
        })
        .collect()
}

pub fn model_lines(current: &str, authenticated: bool) -> Vec<String> {
    MODELS
        .iter()
        .map(|model| {
            let marker = if model.id == current { '*' } else { ' ' };
            let tier = match (model.tier, authenticated) {
                (ModelTier::Premium, false) => " [sign in required]",
                (ModelTier::Premium, true) => " [premium]",
                (ModelTier::Standard, _) => "",
            };
            format!(
                "{marker} {:<13} {}: {}{tier}",
                model.id, model.name, model.description
            )
        })
        .collect()
}

pub fn profile_lines(profile: &Profile) -> Vec<String> {
    let mut lines = vec![
        format!("Name:    {}", profile.display_name()),
        format!("Email:   {}", profile.email),
        format!("Plan:    {}", profile.plan),
    ];
    if let Some(created) = &profile.created_at {
        lines.push(format!("Member since: {created}"));
    }
    if let Some(end) = &profile.subscription_end_date {
        lines.push(format!("Subscription renews/ends: {end}"));
    }
    lines
}

pub fn quota_line(remaining: Option<u32>, limit: u32) -> String {
    match remaining {
        None => "Signed in: no free-message limit applies.".to_string(),
        Some(0) => format!("You have used all {limit} free messages. Sign in to keep chatting."),
        Some(left) => format!("{left} of {limit} free messages left."),
    }
}

pub fn auth_prompt_text(prompt: &AuthPrompt, limit: u32) -> String {
    match prompt {
        AuthPrompt::QuotaExhausted => format!(
            "You've reached the limit of {limit} free messages. Use /login or /signup to continue."
        ),
        AuthPrompt::PremiumModel(model) => format!(
            "{model} is a premium model. Use /login or /signup to use it, or pick another with /model."
        ),
    }
}

pub fn stats_lines(stats: &AdminStats) -> Vec<String> {
    let mut lines = vec![
        format!("Users:         {}", stats.total_users),
        format!("Conversations: {}", stats.total_conversations),
        format!("Messages:      {}", stats.total_messages),
        format!(
            "Usage:         {} connected, {} anonymous",
            stats.usage_split.connected, stats.usage_split.anonymous
        ),
    ];
    let usage = model_usage_rows(stats);
    if !usage.is_empty() {
        lines.push("Model usage:".to_string());
        for (model, count, percent) in usage {
            lines.push(format!("  {model:<13} {count:>6}  {percent:5.1}%"));
        }
    }
    if !stats.daily_stats.is_empty() {
        lines.push("Daily messages:".to_string());
        for day in &stats.daily_stats {
            lines.push(format!("  {}  {}", day.date, day.count));
        }
    }
    for (heading, entries) in [
        ("Top users:", &stats.top_users),
        ("Top sessions:", &stats.top_sessions),
    ] {
        if !entries.is_empty() {
            lines.push(heading.to_string());
            lines.extend(entries.iter().map(|entry| format!("  {}", ranking_entry(entry))));
        }
    }
    lines
}

/// Best-effort one-liner for a free-form ranking entry.
fn ranking_entry(entry: &Value) -> String {
    let label = ["email", "name", "sessionId", "_id", "id"]
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_str));
    let count = ["count", "messageCount", "messages"]
        .iter()
        .find_map(|key| entry.get(key).and_then(Value::as_u64));
    match (label, count) {
        (Some(label), Some(count)) => format!("{label}  {count}"),
        (Some(label), None) => label.to_string(),
        _ => entry.to_string(),
    }
}

pub fn user_lines(users: &[Profile]) -> Vec<String> {
    users
        .iter()
        .map(|user| {
            format!(
                "{:<26} {:<32} {:<8} {}",
                user.id,
                user.email,
                user.plan.as_str(),
                user.created_at.as_deref().unwrap_or("-")
            )
        })
        .collect()
}
