//! AniList GraphQL response types and their validation into domain values.

use anifeed_core::{
    activity::{
        AccountId, ActivityEntry, MediaFilter, MediaTitle, ProfileFields, TitleLanguage,
        UserStats,
    },
    error::AnifeedError,
};
use chrono::DateTime;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

/// GraphQL envelope: `data` plus optional `errors`.
#[derive(Debug, Deserialize)]
pub(crate) struct GqlResponse<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GqlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GqlError {
    #[serde(default)]
    pub message: String,
    pub status: Option<u16>,
}

impl<T> GqlResponse<T> {
    /// Whether AniList reported the requested entity as missing.
    pub fn is_not_found(&self) -> bool {
        self.errors.iter().any(|e| e.status == Some(404))
    }

    /// Join error messages for logging.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserData {
    #[serde(rename = "User")]
    pub user: Option<AlUser>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlUser {
    pub id: Option<AccountId>,
    pub name: Option<String>,
    pub avatar: Option<AlAvatar>,
    pub options: Option<AlUserOptions>,
    pub statistics: Option<AlStatistics>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlAvatar {
    pub large: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlUserOptions {
    pub title_language: Option<String>,
    pub profile_color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlStatistics {
    pub anime: Option<AlMediaStats>,
    pub manga: Option<AlMediaStats>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlMediaStats {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub episodes_watched: i64,
    #[serde(default)]
    pub chapters_read: i64,
    #[serde(default)]
    pub mean_score: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PageData<T> {
    #[serde(rename = "Page")]
    pub page: Option<T>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ActivityPage {
    pub activities: Option<Vec<AlActivity>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlActivity {
    pub id: Option<i64>,
    pub status: Option<String>,
    pub progress: Option<String>,
    pub created_at: Option<i64>,
    pub media: Option<AlMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlMedia {
    pub id: Option<i64>,
    pub site_url: Option<String>,
    pub title: Option<AlTitle>,
    pub cover_image: Option<AlCoverImage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlCoverImage {
    pub large: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaListPage {
    pub media_list: Option<Vec<AlMediaListEntry>>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlMediaListEntry {
    pub media_id: Option<i64>,
    pub score: Option<f64>,
    pub repeat: Option<i32>,
    pub notes: Option<String>,
}

/// The `type` argument for the activity query.
pub(crate) fn activity_type(filter: MediaFilter) -> &'static str {
    match filter {
        MediaFilter::Both => "MEDIA_LIST",
        MediaFilter::Anime => "ANIME_LIST",
        MediaFilter::Manga => "MANGA_LIST",
    }
}

/// Translate AniList's named profile colors to hex.
pub(crate) fn profile_color_hex(color: &str) -> Option<String> {
    let color = color.trim();
    if color.starts_with('#') && (color.len() == 7 || color.len() == 4) {
        return Some(color.to_ascii_lowercase());
    }
    let hex = match color.to_ascii_lowercase().as_str() {
        "blue" => "#3db4f2",
        "purple" => "#c063ff",
        "pink" => "#fc9dd6",
        "orange" => "#ef881a",
        "red" => "#e13333",
        "green" => "#4cca51",
        "gray" | "grey" => "#677b94",
        _ => return None,
    };
    Some(hex.to_string())
}

/// Validate a profile response.
pub(crate) fn into_profile(data: UserData) -> Result<ProfileFields, AnifeedError> {
    let user = data
        .user
        .ok_or_else(|| AnifeedError::Adapter("profile response has no User".into()))?;
    let avatar_url = user.avatar.and_then(|a| a.large.or(a.medium));
    let (title_language, accent_color) = match user.options {
        Some(opts) => (
            opts.title_language.as_deref().and_then(TitleLanguage::parse),
            opts.profile_color.as_deref().and_then(profile_color_hex),
        ),
        None => (None, None),
    };
    Ok(ProfileFields {
        avatar_url,
        accent_color,
        title_language,
    })
}

/// Validate an activity page. Entries come back newest first.
///
/// A missing `Page` or `activities` is an adapter failure. Individual entries
/// that are not list activities (or lack an id, status, timestamp, or media)
/// are skipped so one odd entry cannot wedge the subscription.
pub(crate) fn into_entries(data: PageData<ActivityPage>) -> Result<Vec<ActivityEntry>, AnifeedError> {
    let activities = data
        .page
        .and_then(|p| p.activities)
        .ok_or_else(|| AnifeedError::Adapter("activity response has no Page.activities".into()))?;

    let mut entries = Vec::with_capacity(activities.len());
    for raw in activities {
        let (Some(id), Some(status), Some(created_at), Some(media)) =
            (raw.id, raw.status, raw.created_at, raw.media)
        else {
            warn!("anilist: skipping malformed activity entry");
            continue;
        };
        let Some(created_at) = DateTime::from_timestamp(created_at, 0) else {
            warn!("anilist: activity {id} has out-of-range createdAt");
            continue;
        };
        let title = media
            .title
            .map(|t| MediaTitle {
                romaji: t.romaji,
                english: t.english,
                native: t.native,
            })
            .unwrap_or_default();
        entries.push(ActivityEntry {
            id,
            status,
            progress: raw.progress,
            created_at,
            title,
            media_id: media.id,
            artwork_url: media.cover_image.and_then(|c| c.large),
            media_url: media.site_url,
            score: None,
            repeat_count: None,
            note: None,
        });
    }

    // The API sorts ID_DESC; keep that guarantee even if it ever drifts.
    entries.sort_by(|a, b| b.id.cmp(&a.id));
    Ok(entries)
}

/// Distinct media ids referenced by `entries`, in first-seen order.
pub(crate) fn media_ids(entries: &[ActivityEntry]) -> Vec<i64> {
    let mut ids = Vec::new();
    for id in entries.iter().filter_map(|e| e.media_id) {
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Attach score, repeat count, and notes from the account's list entries.
pub(crate) fn apply_list_entries(entries: &mut [ActivityEntry], list: Vec<AlMediaListEntry>) {
    let by_media: HashMap<i64, AlMediaListEntry> = list
        .into_iter()
        .filter_map(|e| Some((e.media_id?, e)))
        .collect();
    for entry in entries.iter_mut() {
        let Some(list_entry) = entry.media_id.and_then(|id| by_media.get(&id)) else {
            continue;
        };
        entry.score = list_entry.score;
        entry.repeat_count = list_entry.repeat;
        entry.note = list_entry.notes.clone();
    }
}

/// Validate a statistics response.
pub(crate) fn into_stats(handle: &str, data: UserData) -> Result<UserStats, AnifeedError> {
    let user = data
        .user
        .ok_or_else(|| AnifeedError::NotFound(format!("AniList user '{handle}'")))?;
    let stats = user
        .statistics
        .ok_or_else(|| AnifeedError::Adapter("stats response has no statistics".into()))?;
    let anime = stats.anime.unwrap_or_default();
    let manga = stats.manga.unwrap_or_default();
    Ok(UserStats {
        handle: user.name.unwrap_or_else(|| handle.to_string()),
        anime_count: anime.count,
        episodes_watched: anime.episodes_watched,
        anime_mean_score: anime.mean_score,
        manga_count: manga.count,
        chapters_read: manga.chapters_read,
        manga_mean_score: manga.mean_score,
    })
}
