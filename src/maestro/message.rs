//! Message bus payloads and inbox rendering

use clap::ValueEnum;
use colored::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_PREVIEW: usize = 200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Inbox marker: `!!!` urgent, `!!` high
    pub fn marker(&self) -> &'static str {
        match self {
            Priority::Urgent => "!!!",
            Priority::High => "!!",
            Priority::Normal => "",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Notification,
    Request,
    Response,
    Status,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
}

/// A message as posted to `/api/messages`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub priority: Priority,
    pub content: MessageContent,
}

impl Message {
    pub fn new(from: &str, to: &str, subject: &str, body: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            subject: subject.to_string(),
            priority: Priority::Normal,
            content: MessageContent {
                kind: MessageKind::Notification,
                message: body.to_string(),
            },
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn kind(mut self, kind: MessageKind) -> Self {
        self.content.kind = kind;
        self
    }

    /// `[BLOCKED] <reason>` status report for an agent that cannot proceed
    pub fn blocked(from: &str, to: &str, reason: &str) -> Self {
        let text = format!("[BLOCKED] {}", reason.trim());
        let subject: String = text.lines().next().unwrap_or_default().chars().take(80).collect();
        Self::new(from, to, &subject, &text)
            .priority(Priority::High)
            .kind(MessageKind::Status)
    }
}

/// Render one inbox message (raw JSON as returned by the bus)
pub fn format_message(msg: &Value) -> String {
    let text = |key: &str| msg.get(key).and_then(Value::as_str);

    let marker = match text("priority") {
        Some("urgent") => Priority::Urgent.marker().red().bold().to_string(),
        Some("high") => Priority::High.marker().yellow().to_string(),
        _ => String::new(),
    };
    let timestamp: String = text("timestamp")
        .or_else(|| text("createdAt"))
        .unwrap_or_default()
        .chars()
        .take(19)
        .collect();
    let from = text("from").unwrap_or("unknown");
    let subject = text("subject").unwrap_or("(no subject)");

    let mut lines = vec![
        format!("{} [{}] From: {}", marker, timestamp, from.bold()),
        format!("   Subject: {}", subject),
    ];

    if let Some(content) = msg.get("content").and_then(Value::as_object) {
        if let Some(kind) = content.get("type").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            lines.push(format!("   Type: {}", kind));
        }
        if let Some(body) = content.get("message").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            lines.push(format!("   Message: {}", truncate(body)));
        }
    }

    lines.join("\n")
}

fn truncate(text: &str) -> String {
    if text.chars().count() > MAX_PREVIEW {
        let head: String = text.chars().take(MAX_PREVIEW - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
