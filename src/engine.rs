//! HLS engine backed by `reqwest` + `m3u8-rs`.
//!
//! The engine validates the manifest in the background and reports
//! `ManifestParsed` or a fatal error through the shared event channel. Media
//! itself is decoded by whatever player opens the attached source.

use std::time::Duration;

use m3u8_rs::Playlist;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::HlsConfig;
use crate::player::{
    AdaptiveEngine, EngineError, EngineErrorKind, EngineEvent, EngineProvider, PlayerEvent,
    Ticket, VideoSurface,
};

#[derive(Clone)]
pub struct HlsEngineProvider {
    client: reqwest::Client,
    events: UnboundedSender<PlayerEvent>,
    enabled: bool,
    max_recoveries: u32,
    timeout: Duration,
}

impl HlsEngineProvider {
    pub fn new(
        client: reqwest::Client,
        events: UnboundedSender<PlayerEvent>,
        config: &HlsConfig,
    ) -> Self {
        Self {
            client,
            events,
            enabled: config.enabled,
            max_recoveries: config.max_recoveries,
            timeout: config.timeout(),
        }
    }
}

impl EngineProvider for HlsEngineProvider {
    type Engine = HlsEngine;

    fn is_supported(&self) -> bool {
        self.enabled
    }

    fn create(&self) -> HlsEngine {
        HlsEngine {
            client: self.client.clone(),
            events: self.events.clone(),
            max_recoveries: self.max_recoveries,
            timeout: self.timeout,
            ticket: None,
            source: None,
            attached: false,
            recoveries: 0,
            task: None,
        }
    }
}

pub struct HlsEngine {
    client: reqwest::Client,
    events: UnboundedSender<PlayerEvent>,
    max_recoveries: u32,
    timeout: Duration,
    ticket: Option<Ticket>,
    source: Option<String>,
    attached: bool,
    recoveries: u32,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManifestSummary {
    Master { variants: usize },
    Media { segments: usize },
}

impl std::fmt::Display for ManifestSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ManifestSummary::Master { variants } => {
                write!(f, "master playlist, {variants} variants")
            }
            ManifestSummary::Media { segments } => {
                write!(f, "media playlist, {segments} segments")
            }
        }
    }
}

impl HlsEngine {
    fn recover(&mut self) {
        self.recoveries = self.recoveries.saturating_add(1);
        self.spawn_load();
    }

    fn abort_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    fn spawn_load(&mut self) {
        let (Some(ticket), Some(url)) = (self.ticket, self.source.clone()) else {
            debug!("HLS load requested before subscribe/load_source, ignoring");
            return;
        };
        if !self.attached {
            debug!("HLS load requested before attach_media, ignoring");
            return;
        }

        self.abort_task();
        let exhausted = self.recoveries >= self.max_recoveries;
        let max_recoveries = self.max_recoveries;
        let client = self.client.clone();
        let events = self.events.clone();
        let timeout = self.timeout;

        self.task = Some(tokio::spawn(async move {
            let event = match fetch_manifest(&client, &url, timeout).await {
                Ok(summary) => {
                    info!("HLS manifest parsed for {}: {}", url, summary);
                    EngineEvent::ManifestParsed
                }
                Err(mut err) if exhausted => {
                    err.kind = EngineErrorKind::Other;
                    err.details =
                        format!("giving up after {max_recoveries} recoveries: {}", err.details);
                    EngineEvent::Error(err)
                }
                Err(err) => EngineEvent::Error(err),
            };
            // Receiver gone means the host shut down.
            let _ = events.send(PlayerEvent::engine(ticket, event));
        }));
    }
}

impl AdaptiveEngine for HlsEngine {
    fn subscribe(&mut self, ticket: Ticket) {
        self.ticket = Some(ticket);
    }

    fn load_source(&mut self, url: &str) {
        self.source = Some(url.to_string());
    }

    fn attach_media(&mut self, video: &mut VideoSurface) {
        let Some(source) = self.source.as_deref() else {
            return;
        };
        video.attach(source);
        self.attached = true;
        self.spawn_load();
    }

    fn start_load(&mut self) {
        self.recover();
    }

    fn recover_media_error(&mut self) {
        self.recover();
    }

    fn destroy(&mut self) {
        self.abort_task();
        self.ticket = None;
        self.source = None;
        self.attached = false;
    }
}

impl Drop for HlsEngine {
    fn drop(&mut self) {
        self.abort_task();
    }
}

fn fatal(kind: EngineErrorKind, details: String) -> EngineError {
    EngineError { fatal: true, kind, details }
}

async fn fetch_manifest(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<ManifestSummary, EngineError> {
    let resp = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| fatal(EngineErrorKind::Network, format!("manifest request failed: {e}")))?;
    let status = resp.status();
    if !status.is_success() {
        return Err(fatal(
            EngineErrorKind::Network,
            format!("manifest request returned {status}"),
        ));
    }
    let body = resp
        .bytes()
        .await
        .map_err(|e| fatal(EngineErrorKind::Network, format!("manifest body failed: {e}")))?;

    match m3u8_rs::parse_playlist_res(&body) {
        Ok(Playlist::MasterPlaylist(pl)) => Ok(ManifestSummary::Master {
            variants: pl.variants.len(),
        }),
        Ok(Playlist::MediaPlaylist(pl)) => Ok(ManifestSummary::Media {
            segments: pl.segments.len(),
        }),
        Err(e) => Err(fatal(EngineErrorKind::Media, format!("unparsable manifest: {e}"))),
    }
}
