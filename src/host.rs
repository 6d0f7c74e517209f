//! Terminal host: external player and browser processes, stderr notices.

use std::process::Stdio;

use anyhow::Context;
use tokio::process::{Child, Command};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use crate::config::PlayerConfig;
use crate::player::{
    MediaEvent, MediaRuntime, Notifier, PlayerEvent, Severity, Surface, Ticket, VideoSurface,
};

/// Renders surfaces by launching external programs: the player for video
/// surfaces and the browser for embedded frames.
pub struct TerminalRuntime {
    player: Option<String>,
    player_args: Vec<String>,
    browser: Option<String>,
    native_mime_types: Vec<String>,
    events: UnboundedSender<PlayerEvent>,
    child: Option<Child>,
}

impl TerminalRuntime {
    pub fn new(config: &PlayerConfig, events: UnboundedSender<PlayerEvent>) -> Self {
        Self {
            player: config.command.clone(),
            player_args: config.args.clone(),
            browser: config.browser.clone(),
            native_mime_types: config.native_mime_types.clone(),
            events,
            child: None,
        }
    }

    pub fn has_child(&self) -> bool {
        self.child.is_some()
    }

    fn stop_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.start_kill() {
                debug!("Previous player process already gone: {}", e);
            }
        }
    }
}

fn spawn(program: &str, args: &[String], url: &str) -> anyhow::Result<Child> {
    Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start {program}"))
}

impl MediaRuntime for TerminalRuntime {
    fn can_play_type(&self, mime: &str) -> bool {
        self.native_mime_types.iter().any(|m| m.eq_ignore_ascii_case(mime))
    }

    fn mount(&mut self, surface: &Surface) {
        self.stop_child();
        match surface {
            Surface::Video(_) => info!("Video surface mounted"),
            Surface::Frame(frame) => match self.browser.as_deref() {
                Some(browser) => match spawn(browser, &[], &frame.src) {
                    Ok(child) => {
                        info!("Opened embedded page {} with {}", frame.src, browser);
                        self.child = Some(child);
                    }
                    Err(e) => warn!("Could not open embedded page {}: {:#}", frame.src, e),
                },
                None => info!("Embedded page ready (no browser configured): {}", frame.src),
            },
        }
    }

    fn load(&mut self, video: &VideoSurface, ticket: Ticket) {
        self.stop_child();
        if video.src.is_empty() {
            return;
        }
        // External players probe metadata themselves; the source is ready as soon as it is set.
        if self
            .events
            .send(PlayerEvent::media(ticket, MediaEvent::LoadedMetadata))
            .is_err()
        {
            debug!("Event receiver closed, dropping metadata event");
        }
    }

    fn play(&mut self, video: &VideoSurface) -> anyhow::Result<()> {
        let source = video.current_source().context("no source loaded")?;
        let player = self.player.clone().context("no player command configured")?;
        self.stop_child();
        let child = spawn(&player, &self.player_args, source)?;
        info!("Started {} for {}", player, source);
        self.child = Some(child);
        Ok(())
    }
}

/// Single-message display on stderr.
#[derive(Debug, Default)]
pub struct ConsoleNotifier {
    current: Option<(Severity, String)>,
}

impl ConsoleNotifier {
    pub fn current(&self) -> Option<(Severity, &str)> {
        self.current.as_ref().map(|(s, m)| (*s, m.as_str()))
    }
}

impl Notifier for ConsoleNotifier {
    fn show(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Warning => {
                warn!("{}", message);
                eprintln!("warning: {message}");
            }
            Severity::Error => {
                error!("{}", message);
                eprintln!("error: {message}");
            }
        }
        self.current = Some((severity, message.to_string()));
    }

    fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::EventKind;
    use tokio::sync::mpsc;

    fn config(command: Option<&str>) -> PlayerConfig {
        PlayerConfig {
            command: command.map(str::to_string),
            args: Vec::new(),
            browser: None,
            native_mime_types: vec!["application/vnd.apple.mpegurl".into()],
        }
    }

    #[test]
    fn native_types_are_case_insensitive() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let runtime = TerminalRuntime::new(&config(None), tx);
        assert!(runtime.can_play_type("Application/VND.Apple.MpegURL"));
        assert!(!runtime.can_play_type("video/mp4"));
    }

    #[tokio::test]
    async fn load_emits_metadata_only_for_a_source() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut runtime = TerminalRuntime::new(&config(None), tx);
        let mut video = VideoSurface::new();
        let ticket = Ticket::default();

        runtime.load(&video, ticket);
        assert!(rx.try_recv().is_err());

        video.src = "http://a/clip.mp4".into();
        runtime.load(&video, ticket);
        let event = rx.try_recv().unwrap();
        assert_eq!(event.kind, EventKind::Media(MediaEvent::LoadedMetadata));
    }

    #[tokio::test]
    async fn play_without_player_is_refused() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut runtime = TerminalRuntime::new(&config(None), tx);
        let mut video = VideoSurface::new();
        assert!(runtime.play(&video).is_err());

        video.src = "http://a/clip.mp4".into();
        let err = runtime.play(&video).unwrap_err();
        assert!(err.to_string().contains("no player command"));
    }

    #[tokio::test]
    async fn play_spawns_the_player() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut runtime = TerminalRuntime::new(&config(Some("true")), tx);
        let mut video = VideoSurface::new();
        video.src = "http://a/clip.mp4".into();

        runtime.play(&video).unwrap();
        assert!(runtime.has_child());

        runtime.load(&VideoSurface::new(), Ticket::default());
        assert!(!runtime.has_child());
    }

    #[tokio::test]
    async fn missing_player_binary_is_an_error() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut runtime = TerminalRuntime::new(&config(Some("mrxtv-no-such-player")), tx);
        let mut video = VideoSurface::new();
        video.src = "http://a/clip.mp4".into();
        assert!(runtime.play(&video).is_err());
        assert!(!runtime.has_child());
    }

    #[test]
    fn notifier_keeps_one_message() {
        let mut notifier = ConsoleNotifier::default();
        notifier.show(Severity::Warning, "first");
        notifier.show(Severity::Error, "second");
        assert_eq!(notifier.current(), Some((Severity::Error, "second")));
        notifier.clear();
        assert_eq!(notifier.current(), None);
    }
}
