//! AI Maestro message bus client
//!
//! Agents talk through `POST {api_url}/api/messages` and read their inbox
//! with `GET {api_url}/api/messages?agent=<name>&action=...`. A send that
//! fails in transport is retried after a delay; once retries run out the
//! failure has to be escalated to a human.

pub mod message;

pub use message::{Message, MessageKind, Priority, format_message};

use eyre::{Context, Result, bail};
use serde_json::Value;
use std::process::Command;
use std::time::Duration;

use crate::config::MaestroConfig;

const DEFAULT_AGENT: &str = "architect-agent";

/// Which inbox view to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboxQuery {
    Unread,
    All,
    Count,
}

impl InboxQuery {
    fn action(&self) -> &'static str {
        match self {
            InboxQuery::Unread | InboxQuery::All => "list",
            InboxQuery::Count => "unread-count",
        }
    }
}

/// Agent name: configured (or SESSION_NAME), else the tmux session, else a default
pub fn resolve_session_name(configured: Option<&str>) -> String {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }

    if which::which("tmux").is_ok()
        && let Ok(output) = Command::new("tmux").args(["display-message", "-p", "#S"]).output()
        && output.status.success()
    {
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !name.is_empty() {
            return name;
        }
    }

    DEFAULT_AGENT.to_string()
}

pub struct MaestroClient {
    api_url: String,
    agent_name: String,
    agent: ureq::Agent,
    retries: u32,
    retry_delay: Duration,
}

impl MaestroClient {
    pub fn new(api_url: &str, agent_name: &str, timeout: Duration, retries: u32, retry_delay: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            agent_name: agent_name.to_string(),
            agent,
            retries,
            retry_delay,
        }
    }

    /// Client from config; `api_url` overrides the configured URL
    pub fn from_config(config: &MaestroConfig, api_url: Option<&str>) -> Self {
        let name = resolve_session_name(config.session_name.as_deref());
        Self::new(
            api_url.unwrap_or(&config.api_url),
            &name,
            Duration::from_secs(config.timeout_secs),
            config.retries,
            Duration::from_secs(config.retry_delay_secs),
        )
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn messages_url(&self) -> String {
        format!("{}/api/messages", self.api_url)
    }

    /// Post a message and return the bus response
    pub fn send(&self, message: &Message) -> Result<Value> {
        let body = serde_json::to_string(message).context("Failed to serialize message")?;
        let attempts = self.retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                log::warn!(
                    "Retrying message to {} in {}s (attempt {}/{})",
                    message.to,
                    self.retry_delay.as_secs(),
                    attempt,
                    attempts
                );
                std::thread::sleep(self.retry_delay);
            }

            let result = self
                .agent
                .post(&self.messages_url())
                .header("Content-Type", "application/json")
                .send(body.as_bytes());

            match result {
                Ok(mut response) => {
                    let text = response
                        .body_mut()
                        .read_to_string()
                        .context("Failed to read message bus response")?;
                    log::info!("Sent message to {}: {}", message.to, message.subject);
                    return parse_body(&text);
                }
                Err(ureq::Error::StatusCode(code)) => {
                    bail!("Message bus rejected message: HTTP {}", code);
                }
                Err(e) => {
                    log::warn!("Message bus unreachable (attempt {}/{}): {}", attempt, attempts, e);
                    last_error = e.to_string();
                }
            }
        }

        bail!(
            "Message to {} not delivered after {} attempt(s): {}. Escalate: the message bus at {} is unavailable",
            message.to,
            attempts,
            last_error,
            self.api_url
        )
    }

    /// Fetch the inbox of this agent
    pub fn inbox(&self, query: InboxQuery) -> Result<Value> {
        let mut request = self
            .agent
            .get(&self.messages_url())
            .query("agent", &self.agent_name)
            .query("action", query.action());
        if query == InboxQuery::Unread {
            request = request.query("status", "unread");
        }

        let mut response = match request.call() {
            Ok(response) => response,
            Err(ureq::Error::StatusCode(code)) => bail!("Message bus error: HTTP {}", code),
            Err(e) => return Err(e).context(format!("Connection to {} failed", self.api_url)),
        };

        let text = response
            .body_mut()
            .read_to_string()
            .context("Failed to read message bus response")?;
        parse_body(&text)
    }
}

fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    serde_json::from_str(text).context("Failed to parse message bus response")
}

/// Receipt id from a send response (`id` or `messageId`)
pub fn receipt_id(response: &Value) -> String {
    response
        .get("id")
        .or_else(|| response.get("messageId"))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Unread count from a count response (`count` or `unreadCount`)
pub fn unread_count(response: &Value) -> u64 {
    response
        .get("count")
        .or_else(|| response.get("unreadCount"))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

pub fn messages(response: &Value) -> Vec<Value> {
    response
        .get("messages")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};

    /// Serve canned responses, one per connection; `None` drops the connection
    fn serve(responses: Vec<Option<(u16, String)>>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let mut requests = Vec::new();
            for response in responses {
                let (stream, _) = listener.accept().unwrap();
                let mut reader = BufReader::new(stream);

                let mut head = String::new();
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some(value) = line.to_lowercase().strip_prefix("content-length:") {
                        content_length = value.trim().parse().unwrap();
                    }
                    head.push_str(&line);
                }
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).unwrap();
                requests.push(format!("{}\n{}", head, String::from_utf8_lossy(&body)));

                let Some((status, body)) = response else {
                    continue;
                };
                let mut stream = reader.into_inner();
                write!(
                    stream,
                    "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                )
                .unwrap();
            }
            requests
        });

        (url, handle)
    }

    fn client(url: &str, retries: u32) -> MaestroClient {
        MaestroClient::new(url, "architect-agent", Duration::from_secs(5), retries, Duration::from_millis(10))
    }

    #[test]
    fn test_send_posts_json() {
        let (url, server) = serve(vec![Some((200, r#"{"id":"msg-1"}"#.to_string()))]);
        let msg = Message::new("architect-agent", "orchestrator", "Spec ready", "done");

        let response = client(&url, 0).send(&msg).unwrap();
        assert_eq!(receipt_id(&response), "msg-1");

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("POST /api/messages"));
        assert!(requests[0].contains(r#""subject":"Spec ready""#));
        assert!(requests[0].contains(r#""content":{"type":"notification","message":"done"}"#));
    }

    #[test]
    fn test_send_retries_transport_failure() {
        let (url, server) = serve(vec![None, Some((200, r#"{"messageId":7}"#.to_string()))]);
        let msg = Message::new("a", "b", "s", "m");

        let response = client(&url, 1).send(&msg).unwrap();
        assert_eq!(receipt_id(&response), "7");
        assert_eq!(server.join().unwrap().len(), 2);
    }

    #[test]
    fn test_send_does_not_retry_http_error() {
        let (url, server) = serve(vec![Some((500, "{}".to_string()))]);
        let msg = Message::new("a", "b", "s", "m");

        let err = client(&url, 3).send(&msg).unwrap_err();
        assert!(err.to_string().contains("HTTP 500"));
        assert_eq!(server.join().unwrap().len(), 1);
    }

    #[test]
    fn test_send_escalates_when_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let err = client(&url, 1).send(&Message::new("a", "b", "s", "m")).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("not delivered after 2 attempt(s)"));
        assert!(text.contains("Escalate"));
    }

    #[test]
    fn test_inbox_query_strings() {
        let (url, server) = serve(vec![
            Some((200, r#"{"messages":[{"from":"x"}]}"#.to_string())),
            Some((200, r#"{"unreadCount":3}"#.to_string())),
        ]);
        let client = client(&url, 0);

        let unread = client.inbox(InboxQuery::Unread).unwrap();
        assert_eq!(messages(&unread).len(), 1);
        let count = client.inbox(InboxQuery::Count).unwrap();
        assert_eq!(unread_count(&count), 3);

        let requests = server.join().unwrap();
        assert!(requests[0].starts_with("GET /api/messages?agent=architect-agent&action=list&status=unread"));
        assert!(requests[1].starts_with("GET /api/messages?agent=architect-agent&action=unread-count"));
    }

    #[test]
    fn test_response_helpers() {
        assert_eq!(receipt_id(&json!({})), "unknown");
        assert_eq!(unread_count(&json!({"count": 2})), 2);
        assert!(messages(&json!({"error": "x"})).is_empty());
    }

    #[test]
    fn test_configured_session_name_wins() {
        assert_eq!(resolve_session_name(Some("libs-svg-agent")), "libs-svg-agent");
    }
}
