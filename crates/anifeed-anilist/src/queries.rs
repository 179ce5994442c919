//! GraphQL documents sent to AniList.

pub(crate) const RESOLVE_USER: &str = "query ($name: String) { User(name: $name) { id name } }";

pub(crate) const USER_PROFILE: &str = "query ($id: Int) { User(id: $id) { id name \
     avatar { large medium } options { titleLanguage profileColor } } }";

pub(crate) const RECENT_ACTIVITY: &str = "query ($userId: Int, $perPage: Int, $type: ActivityType) { \
     Page(page: 1, perPage: $perPage) { \
     activities(userId: $userId, sort: ID_DESC, type: $type) { \
     ... on ListActivity { id status progress createdAt \
     media { id type siteUrl title { romaji english native } coverImage { large } } } } } }";

pub(crate) const LIST_ENTRIES: &str = "query ($userId: Int, $mediaIds: [Int], $perPage: Int) { \
     Page(page: 1, perPage: $perPage) { \
     mediaList(userId: $userId, mediaId_in: $mediaIds) { \
     mediaId score(format: POINT_10_DECIMAL) repeat notes } } }";

pub(crate) const USER_STATS: &str = "query ($name: String) { User(name: $name) { name \
     statistics { anime { count episodesWatched meanScore } \
     manga { count chaptersRead meanScore } } } }";
