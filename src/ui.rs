use std::fmt::Write;

use crate::catalog::{Category, LiveEvent};
use crate::channels::Channel;
use crate::favorites::Favorite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelList {
    All,
    Favorites,
}

pub fn render_live_events<'a>(
    events: impl IntoIterator<Item = &'a LiveEvent>,
    is_live: impl Fn(&LiveEvent) -> bool,
) -> String {
    let mut out = String::new();
    for event in events {
        let badge = if is_live(event) { "[LIVE] " } else { "" };
        let _ = writeln!(out, "{badge}{}", event.title);
        let _ = writeln!(out, "    {}", event.teams);
        let _ = writeln!(out, "    {} - {}", event.date, event.time);
    }
    if out.is_empty() {
        out.push_str("No live or upcoming events found.\n");
    }
    out
}

pub fn render_channels<'a>(
    channels: impl IntoIterator<Item = &'a Channel>,
    favorites: &[Favorite],
    list: ChannelList,
) -> String {
    let mut out = String::new();
    for (i, channel) in channels.into_iter().enumerate() {
        let star = if favorites.iter().any(|f| f.name == channel.name) { "★" } else { "☆" };
        let _ = writeln!(out, "{:>4}. {} {}", i + 1, star, channel.name);
    }
    if out.is_empty() {
        match list {
            ChannelList::All => out.push_str("No channels found.\n"),
            ChannelList::Favorites => out.push_str("No favorite channels found.\n"),
        }
    }
    out
}

pub fn render_categories(categories: &[Category]) -> String {
    if categories.is_empty() {
        return "No categories found.\n".to_string();
    }
    categories
        .iter()
        .map(|c| format!("{} {}\n", c.flag, c.name))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_states() {
        let events: Vec<LiveEvent> = Vec::new();
        let channels: Vec<Channel> = Vec::new();
        assert_eq!(render_live_events(&events, |_| false), "No live or upcoming events found.\n");
        assert_eq!(render_channels(&channels, &[], ChannelList::All), "No channels found.\n");
        assert_eq!(
            render_channels(&channels, &[], ChannelList::Favorites),
            "No favorite channels found.\n"
        );
        assert_eq!(render_categories(&[]), "No categories found.\n");
    }

    #[test]
    fn live_badge_and_favorite_marker() {
        let events = vec![LiveEvent {
            title: "Final".into(),
            teams: "A vs B".into(),
            ..Default::default()
        }];
        let text = render_live_events(&events, |_| true);
        assert!(text.starts_with("[LIVE] Final\n"));

        let channels = vec![
            Channel { name: "One".into(), logo: String::new(), stream: "http://a/1".into() },
            Channel { name: "Two".into(), logo: String::new(), stream: "http://a/2".into() },
        ];
        let favorites = vec![Favorite { name: "Two".into(), stream: "http://a/2".into() }];
        let text = render_channels(&channels, &favorites, ChannelList::All);
        assert_eq!(text, "   1. ☆ One\n   2. ★ Two\n");
    }
}
