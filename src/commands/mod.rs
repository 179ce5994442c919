//! Chat commands: track, untrack, list, stats, help.

mod info;
mod tracking;


use crate::engine::{Engine, FirstPoll};
use std::sync::Arc;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub engine: &'a Arc<Engine>,
    /// Destination the command was issued in; subscriptions are keyed on it.
    pub channel_id: &'a str,
    pub text: &'a str,
}

/// Reply text plus a first poll to release once the reply is out.
pub struct Reply {
    pub text: String,
    pub first_poll: Option<FirstPoll>,
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Self {
            text,
            first_poll: None,
        }
    }
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Track,
    Untrack,
    List,
    Stats,
    Help,
}

impl Command {
    /// Parse a command from message text. Both `/cmd` and the legacy `!cmd`
    /// forms are accepted. Returns `None` for anything else.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/list@anifeed_bot" → "/list").
        let cmd = first.split('@').next().unwrap_or(first);
        let name = cmd.strip_prefix('/').or_else(|| cmd.strip_prefix('!'))?;
        match name.to_ascii_lowercase().as_str() {
            "track" => Some(Self::Track),
            "untrack" => Some(Self::Untrack),
            "list" => Some(Self::List),
            "stats" => Some(Self::Stats),
            "help" | "start" => Some(Self::Help),
            _ => None,
        }
    }
}

/// Arguments after the command word.
fn args(text: &str) -> Vec<&str> {
    text.split_whitespace().skip(1).collect()
}

/// Handle a command and return the reply.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> Reply {
    let args = args(ctx.text);
    match cmd {
        Command::Track => tracking::handle_track(ctx.engine, ctx.channel_id, &args).await,
        Command::Untrack => tracking::handle_untrack(ctx.engine, ctx.channel_id, &args)
            .await
            .into(),
        Command::List => tracking::handle_list(ctx.engine, ctx.channel_id)
            .await
            .into(),
        Command::Stats => info::handle_stats(ctx.engine, &args).await.into(),
        Command::Help => info::handle_help().into(),
    }
}
