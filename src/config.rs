use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use config::{Config, Environment, File};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};

use crate::player::HLS_MIME;

const DEFAULT_PLAYLIST_URL: &str =
    "https://raw.githubusercontent.com/rsfjbd/Mix-Playlist/refs/heads/main/rsbd.m3u";
const DEFAULT_DATA_URL: &str = "https://raw.githubusercontent.com/sultanarabi161/Toffee-channel-bypass/refs/heads/main/toffee_channel_data.json";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub sources: SourcesConfig,
    pub player: PlayerConfig,
    pub hls: HlsConfig,
    pub storage: StorageConfig,
    pub schedule: ScheduleConfig,
}

impl Settings {
    /// Defaults, then the TOML file at `path` if present, then `MRXTV__*`
    /// environment variables (`MRXTV__PLAYER__COMMAND=vlc`).
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("MRXTV")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;
        settings
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    #[serde(alias = "playlist_url", deserialize_with = "deserialize_one_or_many")]
    pub playlist_urls: Vec<String>,
    pub data_url: String,
    pub timeout_secs: u64,
}

impl SourcesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            playlist_urls: vec![DEFAULT_PLAYLIST_URL.to_string()],
            data_url: DEFAULT_DATA_URL.to_string(),
            timeout_secs: 20,
        }
    }
}

fn deserialize_one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => Ok(vec![s]),
        OneOrMany::Many(v) => Ok(v),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// External player used for video surfaces. Unset means playback can
    /// never auto-start.
    pub command: Option<String>,
    pub args: Vec<String>,
    /// Opens embedded pages (frame surfaces).
    pub browser: Option<String>,
    pub native_mime_types: Vec<String>,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            command: Some("mpv".to_string()),
            args: Vec::new(),
            browser: None,
            native_mime_types: vec![
                HLS_MIME.to_string(),
                "video/mp4".to_string(),
                "video/webm".to_string(),
                "video/ogg".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HlsConfig {
    pub enabled: bool,
    pub max_recoveries: u32,
    pub timeout_secs: u64,
}

impl HlsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl Default for HlsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_recoveries: 3,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("mrxtv-storage.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Offset of the event feed's local time from UTC. The feed publishes
    /// Bangladesh time.
    pub utc_offset_hours: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { utc_offset_hours: 6 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let settings = Settings::load("does-not-exist/mrxtv.toml").unwrap();
        assert_eq!(settings.sources.playlist_urls, vec![DEFAULT_PLAYLIST_URL]);
        assert_eq!(settings.hls.max_recoveries, 3);
        assert_eq!(settings.schedule.utc_offset_hours, 6);
        assert!(settings.player.native_mime_types.iter().any(|m| m == HLS_MIME));
    }

    #[test]
    fn single_playlist_url_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mrxtv.toml");
        std::fs::write(
            &path,
            r#"
[sources]
playlist_url = "http://example.com/one.m3u"

[player]
command = "vlc"
args = ["--fullscreen"]

[hls]
enabled = false
"#,
        )
        .unwrap();

        let settings = Settings::load(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.sources.playlist_urls, vec!["http://example.com/one.m3u"]);
        assert_eq!(settings.sources.data_url, DEFAULT_DATA_URL);
        assert_eq!(settings.player.command.as_deref(), Some("vlc"));
        assert_eq!(settings.player.args, vec!["--fullscreen"]);
        assert!(!settings.hls.enabled);
        assert_eq!(settings.hls.max_recoveries, 3);
    }
}
