//! Domain types shared by the store, the activity source, and the channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable numeric account id on the external service.
pub type AccountId = i64;

/// Monotonically increasing activity id on the external service.
pub type ActivityId = i64;

/// Fallback accent color when an account has no profile color.
pub const DEFAULT_ACCENT_COLOR: &str = "#C3B1E1";

/// Which list activity a subscription relays.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFilter {
    #[default]
    Both,
    Anime,
    Manga,
}

impl MediaFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::Anime => "anime",
            Self::Manga => "manga",
        }
    }
}

impl fmt::Display for MediaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" | "all" | "" => Ok(Self::Both),
            "anime" => Ok(Self::Anime),
            "manga" => Ok(Self::Manga),
            other => Err(format!("unknown media filter '{other}'")),
        }
    }
}

/// Preferred language for media titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TitleLanguage {
    Romaji,
    English,
    Native,
}

impl TitleLanguage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Romaji => "ROMAJI",
            Self::English => "ENGLISH",
            Self::Native => "NATIVE",
        }
    }

    /// Parse a service title-language value. Stylised variants map to their base.
    pub fn parse(value: &str) -> Option<Self> {
        let base = value.trim().to_ascii_uppercase();
        let base = base.strip_suffix("_STYLISED").unwrap_or(&base);
        match base {
            "ROMAJI" => Some(Self::Romaji),
            "ENGLISH" => Some(Self::English),
            "NATIVE" => Some(Self::Native),
            _ => None,
        }
    }
}

/// All title variants a media entry carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
    pub native: Option<String>,
}

impl MediaTitle {
    /// Pick the title to display.
    ///
    /// The preferred variant wins when present; otherwise english, romaji,
    /// then native.
    pub fn resolve(&self, preference: Option<TitleLanguage>) -> String {
        fn pick(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.trim().is_empty())
        }
        let preferred = match preference {
            Some(TitleLanguage::Romaji) => pick(&self.romaji),
            Some(TitleLanguage::English) => pick(&self.english),
            Some(TitleLanguage::Native) => pick(&self.native),
            None => None,
        };
        preferred
            .or_else(|| pick(&self.english))
            .or_else(|| pick(&self.romaji))
            .or_else(|| pick(&self.native))
            .unwrap_or("Unknown title")
            .to_string()
    }
}

/// Presentation settings of a tracked account, as fetched from the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileFields {
    pub avatar_url: Option<String>,
    /// Hex color, e.g. `#3db4f2`.
    pub accent_color: Option<String>,
    pub title_language: Option<TitleLanguage>,
}

/// Cached profile settings plus the time they were fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub fields: ProfileFields,
    pub refreshed_at: DateTime<Utc>,
}

/// One list activity entry on the external service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntry {
    pub id: ActivityId,
    /// Status verb, e.g. "watched episode", "completed".
    pub status: String,
    /// Progress text, e.g. "5" or "10 - 12".
    pub progress: Option<String>,
    pub created_at: DateTime<Utc>,
    pub title: MediaTitle,
    /// Service id of the media, used to look up the account's list entry.
    pub media_id: Option<i64>,
    pub artwork_url: Option<String>,
    pub media_url: Option<String>,
    /// Score on a 10-point scale, absent when unscored.
    pub score: Option<f64>,
    pub repeat_count: Option<i32>,
    pub note: Option<String>,
}

/// A rendered-ready description of one new activity entry. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub activity_id: ActivityId,
    pub account_handle: String,
    pub account_url: String,
    pub avatar_url: Option<String>,
    pub accent_color: String,
    pub status: String,
    pub progress: Option<String>,
    pub media_title: String,
    pub artwork_url: Option<String>,
    pub media_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub score: Option<f64>,
    pub repeat_count: Option<i32>,
    pub note: Option<String>,
}

impl Notification {
    /// Build a notification for `entry` using whatever profile data is known.
    pub fn from_activity(
        account_handle: &str,
        profile: Option<&ProfileFields>,
        entry: &ActivityEntry,
    ) -> Self {
        let language = profile.and_then(|p| p.title_language);
        Self {
            activity_id: entry.id,
            account_handle: account_handle.to_string(),
            account_url: format!("https://anilist.co/user/{account_handle}/"),
            avatar_url: profile.and_then(|p| p.avatar_url.clone()),
            accent_color: profile
                .and_then(|p| p.accent_color.clone())
                .unwrap_or_else(|| DEFAULT_ACCENT_COLOR.to_string()),
            status: entry.status.clone(),
            progress: entry.progress.clone().filter(|p| !p.trim().is_empty()),
            media_title: entry.title.resolve(language),
            artwork_url: entry.artwork_url.clone(),
            media_url: entry.media_url.clone(),
            created_at: entry.created_at,
            score: entry.score.filter(|s| *s > 0.0),
            repeat_count: entry.repeat_count.filter(|r| *r > 0),
            note: entry.note.clone().filter(|n| !n.trim().is_empty()),
        }
    }

    /// Status and progress as one phrase, e.g. "watched episode 5 of".
    pub fn headline(&self) -> String {
        match &self.progress {
            Some(progress) => format!("{} {progress} of", self.status),
            None => self.status.clone(),
        }
    }
}

/// Summary statistics for an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub handle: String,
    pub anime_count: i64,
    pub episodes_watched: i64,
    pub anime_mean_score: f64,
    pub manga_count: i64,
    pub chapters_read: i64,
    pub manga_mean_score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(progress: Option<&str>) -> ActivityEntry {
        ActivityEntry {
            id: 42,
            status: "watched episode".to_string(),
            progress: progress.map(str::to_string),
            created_at: DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default(),
            title: MediaTitle {
                romaji: Some("Shingeki no Kyojin".to_string()),
                english: Some("Attack on Titan".to_string()),
                native: Some("進撃の巨人".to_string()),
            },
            media_id: Some(16498),
            artwork_url: Some("https://img/cover.jpg".to_string()),
            media_url: Some("https://anilist.co/anime/16498".to_string()),
            score: Some(0.0),
            repeat_count: Some(0),
            note: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_media_filter_parse() {
        assert_eq!("Anime".parse::<MediaFilter>(), Ok(MediaFilter::Anime));
        assert_eq!("manga".parse::<MediaFilter>(), Ok(MediaFilter::Manga));
        assert_eq!("".parse::<MediaFilter>(), Ok(MediaFilter::Both));
        assert!("novels".parse::<MediaFilter>().is_err());
    }

    #[test]
    fn test_title_language_stylised() {
        assert_eq!(
            TitleLanguage::parse("ENGLISH_STYLISED"),
            Some(TitleLanguage::English)
        );
        assert_eq!(TitleLanguage::parse("native"), Some(TitleLanguage::Native));
        assert_eq!(TitleLanguage::parse("KLINGON"), None);
    }

    #[test]
    fn test_title_resolution_prefers_language() {
        let title = entry(None).title;
        assert_eq!(
            title.resolve(Some(TitleLanguage::Romaji)),
            "Shingeki no Kyojin"
        );
        assert_eq!(title.resolve(Some(TitleLanguage::Native)), "進撃の巨人");
        assert_eq!(title.resolve(None), "Attack on Titan");
    }

    #[test]
    fn test_title_resolution_falls_back() {
        let title = MediaTitle {
            romaji: Some("Yuru Camp".to_string()),
            english: None,
            native: None,
        };
        assert_eq!(title.resolve(Some(TitleLanguage::English)), "Yuru Camp");
        assert_eq!(MediaTitle::default().resolve(None), "Unknown title");
    }

    #[test]
    fn test_notification_drops_empty_optionals() {
        let n = Notification::from_activity("Alice", None, &entry(Some("5")));
        assert_eq!(n.score, None);
        assert_eq!(n.repeat_count, None);
        assert_eq!(n.note, None);
        assert_eq!(n.accent_color, DEFAULT_ACCENT_COLOR);
        assert_eq!(n.account_url, "https://anilist.co/user/Alice/");
        assert_eq!(n.headline(), "watched episode 5 of");
    }

    #[test]
    fn test_notification_uses_profile() {
        let profile = ProfileFields {
            avatar_url: Some("https://img/avatar.png".to_string()),
            accent_color: Some("#3db4f2".to_string()),
            title_language: Some(TitleLanguage::Romaji),
        };
        let n = Notification::from_activity("Alice", Some(&profile), &entry(None));
        assert_eq!(n.media_title, "Shingeki no Kyojin");
        assert_eq!(n.accent_color, "#3db4f2");
        assert_eq!(n.headline(), "watched episode");
    }
}
