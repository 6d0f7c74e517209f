use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static RE_EXTINF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#EXTINF:-1\s*(.*?),(.*)").expect("valid EXTINF pattern"));
static RE_LOGO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"tvg-logo="([^"]+)""#).expect("valid tvg-logo pattern"));

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Channel {
    pub name: String,
    #[serde(default)]
    pub logo: String,
    pub stream: String,
}

/// Parses the `#EXTINF:-1 <attributes>,<name>` + `http...` subset of M3U.
///
/// Malformed lines are skipped. A header only turns into a channel once a
/// stream URL follows it.
pub fn parse_m3u(content: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut current: Option<Channel> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with("#EXTINF") {
            let Some(caps) = RE_EXTINF.captures(line) else {
                debug!("Skipping unrecognised playlist header: {}", line);
                continue;
            };
            let logo = RE_LOGO
                .captures(&caps[1])
                .map(|m| m[1].to_string())
                .unwrap_or_default();
            current = Some(Channel {
                name: caps[2].to_string(),
                logo,
                stream: String::new(),
            });
        } else if line.starts_with("http") {
            // Reset after every URL line, matched or not.
            if let Some(mut channel) = current.take() {
                channel.stream = line.to_string();
                if !channel.name.is_empty() && !channel.stream.is_empty() {
                    channels.push(channel);
                }
            }
        }
    }

    channels
}

pub async fn fetch_channels(client: &reqwest::Client, url: &str) -> Result<Vec<Channel>> {
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("failed to fetch M3U playlist from {url}"))?;
    let status = resp.status();
    if !status.is_success() {
        bail!("failed to fetch M3U playlist from {url}: status {status}");
    }
    let text = resp.text().await?;
    Ok(parse_m3u(&text))
}
