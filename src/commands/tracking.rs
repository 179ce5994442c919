use super::Reply;
use crate::engine::Engine;
use anifeed_core::{activity::MediaFilter, error::AnifeedError};
use std::sync::Arc;
use tracing::{error, info};

/// Turn an engine error into a reply that does not leak internals.
pub(super) fn describe_error(handle: &str, err: &AnifeedError) -> String {
    match err {
        AnifeedError::NotFound(_) => format!("Could not find AniList user \"{handle}\"."),
        AnifeedError::DuplicateSubscription(_) => {
            format!("{handle} is already tracked in this chat.")
        }
        AnifeedError::Adapter(_) => {
            "AniList is not responding right now. Try again in a few minutes.".to_string()
        }
        other => {
            error!("command for {handle} failed: {other}");
            "Something went wrong on our side. Try again later.".to_string()
        }
    }
}

/// /track <username> [both|anime|manga]
pub(super) async fn handle_track(engine: &Arc<Engine>, channel_id: &str, args: &[&str]) -> Reply {
    let Some(handle) = args.first() else {
        return "Usage: /track <username> [both|anime|manga]".to_string().into();
    };
    let filter = match args.get(1) {
        Some(raw) => match raw.parse::<MediaFilter>() {
            Ok(f) => f,
            Err(_) => {
                return format!("Unknown filter \"{raw}\". Use both, anime, or manga.").into()
            }
        },
        None => MediaFilter::Both,
    };

    match engine.track(channel_id, handle, filter).await {
        Ok(tracked) => {
            let scope = match filter {
                MediaFilter::Both => String::new(),
                other => format!(" ({other} only)"),
            };
            Reply {
                text: format!(
                    "Now tracking {}{scope}. Their latest activity will show up here shortly.",
                    tracked.subscription.account_handle
                ),
                first_poll: Some(tracked.first_poll),
            }
        }
        Err(e) => {
            info!("track {handle} in {channel_id} rejected: {e}");
            describe_error(handle, &e).into()
        }
    }
}

/// /untrack <username>
pub(super) async fn handle_untrack(
    engine: &Arc<Engine>,
    channel_id: &str,
    args: &[&str],
) -> String {
    let Some(handle) = args.first() else {
        return "Usage: /untrack <username>".to_string();
    };
    match engine.untrack(channel_id, handle).await {
        Ok(sub) => format!("Stopped tracking {}.", sub.account_handle),
        Err(AnifeedError::NotFound(_)) => format!("{handle} is not tracked in this chat."),
        Err(e) => describe_error(handle, &e),
    }
}

/// /list
pub(super) async fn handle_list(engine: &Arc<Engine>, channel_id: &str) -> String {
    let subs = engine.list(channel_id).await;
    if subs.is_empty() {
        return "No AniList users are tracked in this chat. Add one with /track <username>."
            .to_string();
    }
    let mut lines = vec![format!("Tracked users ({}):", subs.len())];
    for sub in &subs {
        match sub.media_filter {
            MediaFilter::Both => lines.push(format!("- {}", sub.account_handle)),
            other => lines.push(format!("- {} ({other})", sub.account_handle)),
        }
    }
    lines.join("\n")
}
