pub mod catalog;
pub mod channels;
pub mod config;
pub mod engine;
pub mod favorites;
pub mod host;
pub mod player;
pub mod schedule;
pub mod ui;

use std::time::Duration;

use engine::HlsEngineProvider;
use host::{ConsoleNotifier, TerminalRuntime};
use player::PlaybackDispatcher;

pub type TerminalDispatcher =
    PlaybackDispatcher<HlsEngineProvider, TerminalRuntime, ConsoleNotifier>;

pub fn http_client(timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("mrxtv/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(timeout)
        .build()?;
    Ok(client)
}
