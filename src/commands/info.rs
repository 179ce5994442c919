use super::tracking::describe_error;
use crate::engine::Engine;
use anifeed_core::activity::UserStats;
use std::sync::Arc;

/// /stats <username>
pub(super) async fn handle_stats(engine: &Arc<Engine>, args: &[&str]) -> String {
    let Some(handle) = args.first() else {
        return "Usage: /stats <username>".to_string();
    };
    match engine.source().fetch_stats(handle).await {
        Ok(stats) => format_stats(&stats),
        Err(e) => describe_error(handle, &e),
    }
}

pub(super) fn format_stats(stats: &UserStats) -> String {
    format!(
        "AniList stats for {}\n\n\
         Anime: {} titles, {} episodes, mean score {:.1}\n\
         Manga: {} titles, {} chapters, mean score {:.1}\n\n\
         https://anilist.co/user/{}/",
        stats.handle,
        stats.anime_count,
        stats.episodes_watched,
        stats.anime_mean_score,
        stats.manga_count,
        stats.chapters_read,
        stats.manga_mean_score,
        stats.handle,
    )
}

/// /help
pub(super) fn handle_help() -> String {
    [
        "AniList activity feed",
        "",
        "/track <username> [both|anime|manga] - relay a user's list activity here",
        "/untrack <username> - stop relaying a user",
        "/list - users tracked in this chat",
        "/stats <username> - anime and manga totals",
        "/help - this message",
        "",
        "The !track, !untrack, !list, !stats and !help forms work too.",
    ]
    .join("\n")
}
