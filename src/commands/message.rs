//! AI Maestro messaging commands

use colored::*;
use eyre::Result;

use super::Context;
use crate::cli::MessageAction;
use crate::maestro::{self, InboxQuery, MaestroClient, Message, format_message};

pub fn run(action: MessageAction, ctx: &Context) -> Result<()> {
    match action {
        MessageAction::Send {
            to,
            subject,
            message,
            priority,
            kind,
            api_url,
            json,
        } => {
            let client = MaestroClient::from_config(&ctx.config.maestro, api_url.as_deref());
            let msg = Message::new(client.agent_name(), &to, &subject, &message)
                .priority(priority)
                .kind(kind);
            send(&client, &msg, json, ctx)
        }
        MessageAction::Inbox {
            all,
            count,
            api_url,
            json,
        } => {
            let client = MaestroClient::from_config(&ctx.config.maestro, api_url.as_deref());
            // --count wins over --all
            let query = if count {
                InboxQuery::Count
            } else if all {
                InboxQuery::All
            } else {
                InboxQuery::Unread
            };
            inbox(&client, query, json)
        }
        MessageAction::Blocked { to, reason, api_url } => {
            let client = MaestroClient::from_config(&ctx.config.maestro, api_url.as_deref());
            let msg = Message::blocked(client.agent_name(), &to, &reason);
            send(&client, &msg, false, ctx)
        }
    }
}

fn send(client: &MaestroClient, msg: &Message, json: bool, ctx: &Context) -> Result<()> {
    let response = client.send(msg)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else if !ctx.quiet {
        println!("{} Message sent to {}", "✓".green(), msg.to.cyan());
        println!("  Subject: {}", msg.subject);
        println!("  ID: {}", maestro::receipt_id(&response));
    }
    Ok(())
}

fn inbox(client: &MaestroClient, query: InboxQuery, json: bool) -> Result<()> {
    let response = client.inbox(query)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    // Count mode prints a bare number
    if query == InboxQuery::Count {
        println!("{}", maestro::unread_count(&response));
        return Ok(());
    }

    let messages = maestro::messages(&response);
    let label = if query == InboxQuery::All { "messages" } else { "unread messages" };
    if messages.is_empty() {
        println!("No {} for {}", label, client.agent_name());
        return Ok(());
    }

    println!("{}", format!("{} {} for {}", messages.len(), label, client.agent_name()).bold());
    println!("{}", "═".repeat(50));
    for msg in &messages {
        println!("{}", format_message(msg));
        println!();
    }
    Ok(())
}
