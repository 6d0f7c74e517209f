use anyhow::{bail, Context, Result};
use serde::de::{Deserialize, Deserializer};
use serde::Serialize;
use tracing::info;

use crate::channels::{fetch_channels, Channel};
use crate::config::SourcesConfig;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(default)]
pub struct LiveEvent {
    pub title: String,
    pub teams: String,
    /// `DD/MM/YYYY`
    pub date: String,
    /// `HH:MM AM/PM`
    pub time: String,
    pub logo1: String,
    pub logo2: String,
}

impl LiveEvent {
    /// Splits `"Home vs Away"`. Missing sides are empty.
    pub fn sides(&self) -> (&str, &str) {
        match self.teams.split_once(" vs ") {
            Some((home, away)) => (home, away),
            None => (self.teams.as_str(), ""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, Serialize)]
#[serde(default)]
pub struct Category {
    pub name: String,
    pub flag: String,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct StaticData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub live_events: Vec<LiveEvent>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<Category>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

pub async fn fetch_static_data(client: &reqwest::Client, url: &str) -> Result<StaticData> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch static data from {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("failed to fetch static data from {url}: status {status}");
    }
    let text = resp.text().await?;
    serde_json::from_str(&text).with_context(|| format!("invalid static data from {url}"))
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub live_events: Vec<LiveEvent>,
    pub sports_channels: Vec<Channel>,
    pub categories: Vec<Category>,
}

#[derive(Debug, Default)]
pub struct SearchResults<'a> {
    pub live_events: Vec<&'a LiveEvent>,
    pub sports_channels: Vec<&'a Channel>,
}

impl Catalog {
    /// Fetches playlists then static data. Whatever was assigned before a
    /// failure stays assigned.
    pub async fn load(&mut self, client: &reqwest::Client, sources: &SourcesConfig) -> Result<()> {
        let mut channels = Vec::new();
        for url in &sources.playlist_urls {
            info!("Fetching channel list from {}...", url);
            let mut c = fetch_channels(client, url).await?;
            info!("Loaded {} channels from {}", c.len(), url);
            channels.append(&mut c);
        }
        self.sports_channels = channels;

        let data = fetch_static_data(client, &sources.data_url).await?;
        info!(
            "Loaded {} live events and {} categories from {}",
            data.live_events.len(),
            data.categories.len(),
            sources.data_url
        );
        self.live_events = data.live_events;
        self.categories = data.categories;
        Ok(())
    }

    /// Case-insensitive substring search over event titles/teams and channel names.
    pub fn search(&self, query: &str) -> SearchResults<'_> {
        let query = query.to_lowercase();
        SearchResults {
            live_events: self
                .live_events
                .iter()
                .filter(|e| {
                    e.title.to_lowercase().contains(&query)
                        || e.teams.to_lowercase().contains(&query)
                })
                .collect(),
            sports_channels: self
                .sports_channels
                .iter()
                .filter(|c| c.name.to_lowercase().contains(&query))
                .collect(),
        }
    }

    /// Resolves a 1-based index, an exact name (case-insensitive), or a
    /// unique partial name.
    pub fn find_channel(&self, selector: &str) -> Option<&Channel> {
        let selector = selector.trim();
        if selector.is_empty() {
            return None;
        }
        if let Ok(idx) = selector.parse::<usize>() {
            return idx.checked_sub(1).and_then(|i| self.sports_channels.get(i));
        }
        if let Some(c) = self
            .sports_channels
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(selector))
        {
            return Some(c);
        }
        let needle = selector.to_lowercase();
        let mut matches = self
            .sports_channels
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle));
        match (matches.next(), matches.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }
}

pub fn load_failure_message(err: &anyhow::Error) -> String {
    format!("Failed to load content: {err:#}. Please check your URLs and internet connection.")
}
