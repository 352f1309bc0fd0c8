use eyre::{Context as _, Result};
use std::io::{self, Read};

use super::Context;
use crate::cli::HookAction;
use crate::design::handoff::GhCli;
use crate::hook::stop::find_project_root;
use crate::hook::{HookEvent, HookHandler, HookResult, StopGuard, parse_payload};

pub fn run(action: HookAction, ctx: &Context) -> Result<()> {
    match action {
        HookAction::Stop => dispatch(HookEvent::Stop, ctx),
        HookAction::SubagentStop => dispatch(HookEvent::SubagentStop, ctx),
    }
}

fn dispatch(event: HookEvent, ctx: &Context) -> Result<()> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read payload from stdin")?;
    let payload = parse_payload(&buffer);

    log::info!("Dispatching hook event: {:?}", event);
    log::debug!("Payload: {}", payload);

    // gh is optional here; the issue check skips itself when it is unusable
    let guard = StopGuard::new(find_project_root(&ctx.project_root)).with_tracker(Box::new(GhCli::new()));
    let result = if guard.handles(event) {
        guard.handle(event, &payload)
    } else {
        HookResult::Allow
    };

    if let HookResult::Block { output } = &result {
        println!("{}", output);
    }
    std::process::exit(result.exit_code());
}
