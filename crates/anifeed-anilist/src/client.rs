//! HTTP client and `ActivitySource` implementation.

use crate::queries;
use crate::types::{self, ActivityPage, GqlResponse, MediaListPage, PageData, UserData};
use anifeed_core::{
    activity::{AccountId, ActivityEntry, MediaFilter, ProfileFields, UserStats},
    config::AniListConfig,
    error::AnifeedError,
    traits::ActivitySource,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// AniList GraphQL client.
pub struct AniListClient {
    client: reqwest::Client,
    base_url: String,
}

impl AniListClient {
    /// Create from config values.
    pub fn from_config(config: &AniListConfig) -> Result<Self, AnifeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| AnifeedError::Adapter(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    /// POST one GraphQL document and decode the envelope.
    ///
    /// HTTP 404 is passed through as a decodable envelope so callers can tell
    /// "no such user" apart from transport failures.
    async fn post<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<GqlResponse<T>, AnifeedError> {
        let body = json!({ "query": query, "variables": variables });
        debug!("anilist: POST {}", self.base_url);

        let resp = self
            .client
            .post(&self.base_url)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AnifeedError::Adapter(format!("anilist request failed: {e}")))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("?")
                .to_string();
            return Err(AnifeedError::Adapter(format!(
                "anilist rate limited (retry after {retry_after}s)"
            )));
        }
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            let text = resp.text().await.unwrap_or_default();
            return Err(AnifeedError::Adapter(format!(
                "anilist returned {status}: {text}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| AnifeedError::Adapter(format!("anilist: failed to parse response: {e}")))
    }
}

#[async_trait]
impl ActivitySource for AniListClient {
    fn name(&self) -> &str {
        "anilist"
    }

    async fn resolve_account(&self, handle: &str) -> Result<AccountId, AnifeedError> {
        let resp: GqlResponse<UserData> = self
            .post(queries::RESOLVE_USER, json!({ "name": handle }))
            .await?;
        let not_found = resp.is_not_found();
        match resp.data.and_then(|d| d.user).and_then(|u| u.id) {
            Some(id) => Ok(id),
            None if not_found => Err(AnifeedError::NotFound(format!("AniList user '{handle}'"))),
            None => Err(AnifeedError::Adapter(format!(
                "user lookup for '{handle}' returned no id"
            ))),
        }
    }

    async fn fetch_profile(&self, account_id: AccountId) -> Result<ProfileFields, AnifeedError> {
        let resp: GqlResponse<UserData> = self
            .post(queries::USER_PROFILE, json!({ "id": account_id }))
            .await?;
        let summary = resp.error_summary();
        let data = resp.data.ok_or_else(|| {
            AnifeedError::Adapter(format!("profile for {account_id} returned no data: {summary}"))
        })?;
        types::into_profile(data)
    }

    async fn fetch_recent_activity(
        &self,
        account_id: AccountId,
        filter: MediaFilter,
        page_size: usize,
    ) -> Result<Vec<ActivityEntry>, AnifeedError> {
        let vars = json!({
            "userId": account_id,
            "perPage": page_size,
            "type": types::activity_type(filter),
        });
        let resp: GqlResponse<PageData<ActivityPage>> =
            self.post(queries::RECENT_ACTIVITY, vars).await?;
        let summary = resp.error_summary();
        let page = resp.data.ok_or_else(|| {
            AnifeedError::Adapter(format!("activity for {account_id} returned no data: {summary}"))
        })?;

        types::into_entries(page)
    }

    async fn fetch_list_details(
        &self,
        account_id: AccountId,
        entries: &mut [ActivityEntry],
    ) -> Result<(), AnifeedError> {
        let media_ids = types::media_ids(entries);
        if media_ids.is_empty() {
            return Ok(());
        }
        let vars = json!({
            "userId": account_id,
            "perPage": media_ids.len(),
            "mediaIds": media_ids,
        });
        let resp: GqlResponse<PageData<MediaListPage>> =
            self.post(queries::LIST_ENTRIES, vars).await?;
        let summary = resp.error_summary();
        let list = resp
            .data
            .and_then(|d| d.page)
            .and_then(|p| p.media_list)
            .ok_or_else(|| {
                AnifeedError::Adapter(format!(
                    "list entries for {account_id} returned no data: {summary}"
                ))
            })?;
        types::apply_list_entries(entries, list);
        Ok(())
    }

    async fn fetch_stats(&self, handle: &str) -> Result<UserStats, AnifeedError> {
        let resp: GqlResponse<UserData> = self
            .post(queries::USER_STATS, json!({ "name": handle }))
            .await?;
        if resp.is_not_found() {
            return Err(AnifeedError::NotFound(format!("AniList user '{handle}'")));
        }
        let summary = resp.error_summary();
        let data = resp.data.ok_or_else(|| {
            AnifeedError::Adapter(format!("stats for '{handle}' returned no data: {summary}"))
        })?;
        types::into_stats(handle, data)
    }
}
