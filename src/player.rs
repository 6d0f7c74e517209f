//! Playback dispatch: picks a strategy for a stream URL and drives the
//! display surface and the adaptive engine through their lifecycle.
//!
//! The dispatcher never talks to a concrete player. Hosts implement
//! [`MediaRuntime`] and [`Notifier`], and optionally provide an
//! [`EngineProvider`] for HLS. Asynchronous callbacks come back through
//! [`PlaybackDispatcher::handle_event`] tagged with the [`Ticket`] of the
//! attempt that produced them.

use thiserror::Error;
use tracing::{debug, error, info, warn};

pub const HLS_MIME: &str = "application/vnd.apple.mpegurl";
const DIRECT_MEDIA_SUFFIXES: [&str; 3] = [".mp4", ".webm", ".ogg"];
const FRAME_PERMISSIONS: &str = "autoplay; fullscreen";

/// Identifies one `play_stream` attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticket(u64);

impl Ticket {
    fn next(self) -> Self {
        Ticket(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSurface {
    pub src: String,
    pub controls: bool,
    pub autoplay: bool,
    attached: Option<String>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self {
            src: String::new(),
            controls: true,
            autoplay: true,
            attached: None,
        }
    }

    /// Binds an engine-fed source (the engine owns the media pipeline).
    pub fn attach(&mut self, source: &str) {
        self.attached = Some(source.to_string());
    }

    pub fn detach(&mut self) {
        self.attached = None;
    }

    pub fn attached_source(&self) -> Option<&str> {
        self.attached.as_deref()
    }

    /// What a player should actually open: the engine source if attached,
    /// otherwise `src`.
    pub fn current_source(&self) -> Option<&str> {
        self.attached
            .as_deref()
            .or_else(|| (!self.src.is_empty()).then_some(self.src.as_str()))
    }
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSurface {
    pub src: String,
    pub allow: String,
    pub allow_fullscreen: bool,
}

impl FrameSurface {
    pub fn new(src: &str) -> Self {
        Self {
            src: src.to_string(),
            allow: FRAME_PERMISSIONS.to_string(),
            allow_fullscreen: true,
        }
    }

    pub fn allows(&self, feature: &str) -> bool {
        self.allow.split(';').any(|p| p.trim() == feature)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    Video(VideoSurface),
    Frame(FrameSurface),
}

impl Surface {
    /// Swaps a frame for a fresh video surface. Returns true if it replaced one.
    pub fn ensure_video(&mut self) -> bool {
        match self {
            Surface::Video(_) => false,
            Surface::Frame(_) => {
                *self = Surface::Video(VideoSurface::new());
                true
            }
        }
    }

    pub fn replace_with_frame(&mut self, url: &str) {
        *self = Surface::Frame(FrameSurface::new(url));
    }

    pub fn as_video(&self) -> Option<&VideoSurface> {
        match self {
            Surface::Video(v) => Some(v),
            Surface::Frame(_) => None,
        }
    }

    pub fn as_frame(&self) -> Option<&FrameSurface> {
        match self {
            Surface::Frame(f) => Some(f),
            Surface::Video(_) => None,
        }
    }
}

impl Default for Surface {
    fn default() -> Self {
        Surface::Video(VideoSurface::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Video,
    AdaptiveVideo,
    Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Adaptive,
    Direct,
    Embedded,
}

pub fn classify(url: &str) -> StreamKind {
    if url.contains(".m3u8") {
        StreamKind::Adaptive
    } else if DIRECT_MEDIA_SUFFIXES.iter().any(|s| url.contains(s)) {
        StreamKind::Direct
    } else {
        StreamKind::Embedded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    Network,
    Media,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub fatal: bool,
    pub kind: EngineErrorKind,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ManifestParsed,
    Error(EngineError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEvent {
    LoadedMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Engine(EngineEvent),
    Media(MediaEvent),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerEvent {
    pub ticket: Ticket,
    pub kind: EventKind,
}

impl PlayerEvent {
    pub fn engine(ticket: Ticket, event: EngineEvent) -> Self {
        Self { ticket, kind: EventKind::Engine(event) }
    }

    pub fn media(ticket: Ticket, event: MediaEvent) -> Self {
        Self { ticket, kind: EventKind::Media(event) }
    }
}

/// A live adaptive-streaming engine instance.
pub trait AdaptiveEngine {
    /// Tags every event emitted from now on with `ticket`.
    fn subscribe(&mut self, ticket: Ticket);
    fn load_source(&mut self, url: &str);
    fn attach_media(&mut self, video: &mut VideoSurface);
    fn start_load(&mut self);
    fn recover_media_error(&mut self);
    /// Stops all work. No events may be emitted afterwards.
    fn destroy(&mut self);
}

pub trait EngineProvider {
    type Engine: AdaptiveEngine;

    fn is_supported(&self) -> bool;
    fn create(&self) -> Self::Engine;
}

pub trait MediaRuntime {
    fn can_play_type(&self, mime: &str) -> bool;
    /// Called whenever the surface is replaced by one of another kind.
    fn mount(&mut self, surface: &Surface);
    /// Applies the video's current source, dropping any previous media state.
    fn load(&mut self, video: &VideoSurface, ticket: Ticket);
    fn play(&mut self, video: &VideoSurface) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

pub trait Notifier {
    fn show(&mut self, severity: Severity, message: &str);
    fn clear(&mut self);
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("No stream URL available for this channel.")]
    MissingUrl,
    #[error("HLS streams are not supported: no adaptive engine is available and native playback cannot handle application/vnd.apple.mpegurl.")]
    UnsupportedFormat,
    #[error("Autoplay blocked for HLS stream. Please click play manually.")]
    AdaptiveAutoplayBlocked,
    #[error("Video autoplay blocked or failed. Please click play manually.")]
    AutoplayBlocked,
    #[error("Error playing HLS stream. Please try another channel.")]
    EngineFailed,
}

impl PlaybackError {
    pub fn severity(&self) -> Severity {
        match self {
            PlaybackError::AdaptiveAutoplayBlocked | PlaybackError::AutoplayBlocked => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}

pub struct PlaybackSession<E> {
    surface: Surface,
    engine: Option<E>,
    ticket: Ticket,
    awaiting_metadata: bool,
}

impl<E> PlaybackSession<E> {
    fn new(surface: Surface) -> Self {
        Self {
            surface,
            engine: None,
            ticket: Ticket::default(),
            awaiting_metadata: false,
        }
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub fn awaiting_metadata(&self) -> bool {
        self.awaiting_metadata
    }

    pub fn kind(&self) -> SurfaceKind {
        match (&self.surface, &self.engine) {
            (Surface::Frame(_), _) => SurfaceKind::Frame,
            (Surface::Video(_), Some(_)) => SurfaceKind::AdaptiveVideo,
            (Surface::Video(_), None) => SurfaceKind::Video,
        }
    }
}

pub struct PlaybackDispatcher<P: EngineProvider, R, N> {
    engines: Option<P>,
    runtime: R,
    notifier: N,
    session: PlaybackSession<P::Engine>,
}

impl<P, R, N> PlaybackDispatcher<P, R, N>
where
    P: EngineProvider,
    R: MediaRuntime,
    N: Notifier,
{
    pub fn new(engines: Option<P>, runtime: R, notifier: N) -> Self {
        Self {
            engines,
            runtime,
            notifier,
            session: PlaybackSession::new(Surface::default()),
        }
    }

    pub fn session(&self) -> &PlaybackSession<P::Engine> {
        &self.session
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn play_stream(&mut self, url: Option<&str>) {
        let Some(url) = url.filter(|u| !u.is_empty()) else {
            self.report(PlaybackError::MissingUrl);
            return;
        };

        self.teardown_engine();
        self.session.ticket = self.session.ticket.next();
        let ticket = self.session.ticket;
        let kind = classify(url);
        info!("Playing {} as {:?} (attempt {})", url, kind, ticket);

        if self.session.surface.ensure_video() {
            debug!("Replaced embedded frame with a video surface");
            self.runtime.mount(&self.session.surface);
        }
        if let Surface::Video(video) = &mut self.session.surface {
            video.src.clear();
            video.detach();
            self.runtime.load(video, ticket);
        }

        match kind {
            StreamKind::Adaptive => self.play_adaptive(url, ticket),
            StreamKind::Direct => self.play_direct(url, ticket),
            StreamKind::Embedded => {
                self.session.surface.replace_with_frame(url);
                self.runtime.mount(&self.session.surface);
            }
        }
    }

    /// Routes an asynchronous engine or media event. Events from superseded
    /// attempts are dropped.
    pub fn handle_event(&mut self, event: PlayerEvent) {
        if event.ticket != self.session.ticket {
            debug!(
                "Dropping stale event from attempt {} (current {}): {:?}",
                event.ticket, self.session.ticket, event.kind
            );
            return;
        }

        match event.kind {
            EventKind::Engine(EngineEvent::ManifestParsed) => {
                if self.session.engine.is_some() {
                    self.start_playback(PlaybackError::AdaptiveAutoplayBlocked);
                }
            }
            EventKind::Engine(EngineEvent::Error(err)) => self.handle_engine_error(err),
            EventKind::Media(MediaEvent::LoadedMetadata) => {
                if std::mem::take(&mut self.session.awaiting_metadata) {
                    self.start_playback(PlaybackError::AdaptiveAutoplayBlocked);
                }
            }
        }
    }

    /// Releases the engine. The surface keeps its current state.
    pub fn stop(&mut self) {
        self.teardown_engine();
    }

    fn play_adaptive(&mut self, url: &str, ticket: Ticket) {
        let provider = self.engines.as_ref().filter(|p| p.is_supported());
        if let Some(provider) = provider {
            let mut engine = provider.create();
            engine.subscribe(ticket);
            engine.load_source(url);
            if let Surface::Video(video) = &mut self.session.surface {
                engine.attach_media(video);
            }
            self.session.engine = Some(engine);
        } else if self.runtime.can_play_type(HLS_MIME) {
            debug!("No adaptive engine, falling back to native HLS playback");
            if let Surface::Video(video) = &mut self.session.surface {
                video.src = url.to_string();
                self.session.awaiting_metadata = true;
                self.runtime.load(video, ticket);
            }
        } else {
            self.report(PlaybackError::UnsupportedFormat);
        }
    }

    fn play_direct(&mut self, url: &str, ticket: Ticket) {
        if let Surface::Video(video) = &mut self.session.surface {
            video.src = url.to_string();
            self.runtime.load(video, ticket);
        }
        self.start_playback(PlaybackError::AutoplayBlocked);
    }

    fn handle_engine_error(&mut self, err: EngineError) {
        let Some(engine) = self.session.engine.as_mut() else {
            debug!("Engine error without a live engine: {:?}", err);
            return;
        };
        if !err.fatal {
            warn!("Non-fatal HLS error ({:?}): {}", err.kind, err.details);
            return;
        }

        match err.kind {
            EngineErrorKind::Network => {
                error!("Fatal network error encountered, trying to recover: {}", err.details);
                engine.start_load();
            }
            EngineErrorKind::Media => {
                error!("Fatal media error encountered, trying to recover: {}", err.details);
                engine.recover_media_error();
            }
            EngineErrorKind::Other => {
                error!("Fatal HLS error: {}", err.details);
                self.teardown_engine();
                self.report(PlaybackError::EngineFailed);
            }
        }
    }

    fn start_playback(&mut self, on_refused: PlaybackError) {
        let Surface::Video(video) = &self.session.surface else {
            return;
        };
        if let Err(e) = self.runtime.play(video) {
            error!("Autoplay failed: {:#}", e);
            self.report(on_refused);
        }
    }

    fn teardown_engine(&mut self) {
        self.session.awaiting_metadata = false;
        if let Some(mut engine) = self.session.engine.take() {
            debug!("Destroying adaptive engine of attempt {}", self.session.ticket);
            engine.destroy();
        }
    }

    fn report(&mut self, err: PlaybackError) {
        self.notifier.show(err.severity(), &err.to_string());
    }
}
