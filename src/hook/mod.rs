//! Hook event handling
//!
//! Hooks are events fired by the agent host that atlas can intercept.
//! A handler that blocks makes the process exit with code 2.

pub mod stop;

pub use stop::StopGuard;

/// Hook event types atlas handles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Stop,
    SubagentStop,
}

impl HookEvent {
    /// Name the host uses for the event
    pub fn name(&self) -> &'static str {
        match self {
            HookEvent::Stop => "Stop",
            HookEvent::SubagentStop => "SubagentStop",
        }
    }
}

/// Result of a hook handler
#[derive(Debug, Clone)]
pub enum HookResult {
    /// Allow the action to proceed
    Allow,
    /// Block the action; `output` goes to stdout
    Block { output: String },
}

impl HookResult {
    pub fn exit_code(&self) -> i32 {
        match self {
            HookResult::Allow => 0,
            HookResult::Block { .. } => 2,
        }
    }
}

/// A hook handler
pub trait HookHandler {
    fn handles(&self, event: HookEvent) -> bool;
    fn handle(&self, event: HookEvent, payload: &serde_json::Value) -> HookResult;
}

/// Parse a hook payload; empty or invalid input is an empty object
pub fn parse_payload(input: &str) -> serde_json::Value {
    if input.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(input).unwrap_or_else(|e| {
        log::debug!("Ignoring invalid hook payload: {}", e);
        serde_json::json!({})
    })
}
