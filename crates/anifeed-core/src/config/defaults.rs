pub(super) fn default_name() -> String {
    "anifeed".to_string()
}
pub(super) fn default_data_dir() -> String {
    "~/.anifeed".to_string()
}
pub(super) fn default_log_level() -> String {
    "info".to_string()
}
pub(super) fn default_db_path() -> String {
    "~/.anifeed/data/anifeed.db".to_string()
}
pub(super) fn default_anilist_base_url() -> String {
    "https://graphql.anilist.co".to_string()
}
pub(super) fn default_anilist_timeout_secs() -> u64 {
    20
}
pub(super) fn default_page_size() -> usize {
    50
}
pub(super) fn default_true() -> bool {
    true
}
pub(super) fn default_sweep_interval_secs() -> u64 {
    300
}
pub(super) fn default_max_notifications() -> usize {
    15
}
pub(super) fn default_profile_ttl_hours() -> u64 {
    24
}
pub(super) fn default_max_concurrent_polls() -> usize {
    4
}
pub(super) fn default_shutdown_grace_secs() -> u64 {
    10
}
pub(super) fn default_delivery_timeout_secs() -> u64 {
    30
}
