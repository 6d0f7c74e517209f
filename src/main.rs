use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};
use mrxtv::catalog::{load_failure_message, Catalog};
use mrxtv::channels::Channel;
use mrxtv::config::Settings;
use mrxtv::engine::HlsEngineProvider;
use mrxtv::favorites::{Favorites, FileStore};
use mrxtv::host::{ConsoleNotifier, TerminalRuntime};
use mrxtv::player::{Notifier, PlaybackDispatcher, Severity};
use mrxtv::ui::{self, ChannelList};
use mrxtv::{http_client, schedule, TerminalDispatcher};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(long, default_value = "mrxtv.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List sports channels from the playlist
    Channels {
        #[arg(long)]
        search: Option<String>,
    },
    /// List live and upcoming events
    Events {
        #[arg(long)]
        search: Option<String>,
    },
    /// List categories
    Categories,
    /// List favorite channels
    Favorites,
    /// Add or remove a channel from favorites
    Favorite {
        /// Channel number or name
        channel: String,
    },
    /// Play a channel (the first one by default), then switch from stdin
    Play {
        /// Channel number or name
        channel: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let settings = Settings::load(&args.config)?;
    info!("Configuration loaded from {}: {:?}", args.config, settings);

    let mut favorites = Favorites::new(FileStore::new(&settings.storage.path));
    if matches!(args.command, Command::Favorites) {
        let list = favorites.get_favorites();
        let channels: Vec<Channel> = list.iter().map(Channel::from).collect();
        print!("{}", ui::render_channels(&channels, &list, ChannelList::Favorites));
        return Ok(ExitCode::SUCCESS);
    }

    let client = http_client(settings.sources.timeout())?;
    let mut notifier = ConsoleNotifier::default();
    let mut catalog = Catalog::default();
    if let Err(e) = catalog.load(&client, &settings.sources).await {
        error!("Could not fetch or parse data: {:#}", e);
        notifier.show(Severity::Error, &load_failure_message(&e));
        return Ok(ExitCode::FAILURE);
    }

    match args.command {
        Command::Channels { search } => {
            let channels = match search.as_deref() {
                Some(q) => catalog.search(q).sports_channels,
                None => catalog.sports_channels.iter().collect(),
            };
            let list = favorites.get_favorites();
            print!("{}", ui::render_channels(channels, &list, ChannelList::All));
        }
        Command::Events { search } => {
            let events = match search.as_deref() {
                Some(q) => catalog.search(q).live_events,
                None => catalog.live_events.iter().collect(),
            };
            let offset = schedule::feed_offset(settings.schedule.utc_offset_hours);
            let now = Utc::now();
            print!(
                "{}",
                ui::render_live_events(events, |e| schedule::is_live(&e.date, &e.time, now, offset))
            );
        }
        Command::Categories => print!("{}", ui::render_categories(&catalog.categories)),
        Command::Favorite { channel } => {
            let Some(found) = catalog.find_channel(&channel) else {
                notifier.show(Severity::Error, &format!("No channel matches '{channel}'."));
                return Ok(ExitCode::FAILURE);
            };
            let list = favorites.toggle_favorite(&found.name, &found.stream);
            let state = if list.iter().any(|f| f.name == found.name) {
                "added to"
            } else {
                "removed from"
            };
            println!("{} {} favorites.", found.name, state);
        }
        Command::Play { channel } => play(&catalog, channel.as_deref(), &settings, client).await?,
        Command::Favorites => {}
    }

    Ok(ExitCode::SUCCESS)
}

fn select(dispatcher: &mut TerminalDispatcher, catalog: &Catalog, selector: &str) {
    match catalog.find_channel(selector) {
        Some(channel) => {
            println!("Playing {}", channel.name);
            dispatcher.notifier_mut().clear();
            dispatcher.play_stream(Some(&channel.stream));
        }
        None => dispatcher
            .notifier_mut()
            .show(Severity::Warning, &format!("No channel matches '{selector}'.")),
    }
}

async fn play(
    catalog: &Catalog,
    selector: Option<&str>,
    settings: &Settings,
    client: reqwest::Client,
) -> anyhow::Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let engines = HlsEngineProvider::new(client, tx.clone(), &settings.hls);
    let runtime = TerminalRuntime::new(&settings.player, tx);
    let mut dispatcher =
        PlaybackDispatcher::new(Some(engines), runtime, ConsoleNotifier::default());

    match selector {
        Some(selector) => select(&mut dispatcher, catalog, selector),
        None if catalog.sports_channels.is_empty() => {
            info!("Playlist is empty, nothing to auto-play")
        }
        None => select(&mut dispatcher, catalog, "1"),
    }

    println!("Type a channel number or name to switch, 'q' to quit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            Some(event) = rx.recv() => dispatcher.handle_event(event),
            line = lines.next_line(), if stdin_open => match line? {
                None => stdin_open = false,
                Some(line) => match line.trim() {
                    "" => {}
                    "q" | "quit" => break,
                    selector => select(&mut dispatcher, catalog, selector),
                },
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    dispatcher.stop();
    Ok(())
}
