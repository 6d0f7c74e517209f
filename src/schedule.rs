use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static RE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+):(\d+)\s*(AM|PM)?").expect("valid time pattern"));

const LIVE_WINDOW_HOURS: i64 = 2;

pub fn feed_offset(hours: i32) -> FixedOffset {
    FixedOffset::east_opt(hours.clamp(-23, 23) * 3600).unwrap_or_else(|| Utc.fix())
}

/// Parses a feed date (`DD/MM/YYYY`) and time (`HH:MM`, optional `AM`/`PM`)
/// in the feed's UTC offset.
pub fn event_start(date: &str, time: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let mut parts = date.trim().split('/').map(|p| p.trim().parse::<u32>().ok());
    let (Some(Some(day)), Some(Some(month)), Some(Some(year))) =
        (parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let date = NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, day)?;

    let caps = RE_TIME.captures(time)?;
    let mut hours: u32 = caps[1].parse().ok()?;
    let minutes: u32 = caps[2].parse().ok()?;
    match caps.get(3).map(|m| m.as_str().to_ascii_uppercase()).as_deref() {
        Some("PM") if hours != 12 => hours = hours.checked_add(12)?,
        Some("AM") if hours == 12 => hours = 0,
        _ => {}
    }
    let time = NaiveTime::from_hms_opt(hours, minutes, 0)?;

    offset.from_local_datetime(&date.and_time(time)).single()
}

/// An event is live if it started within the last two hours.
pub fn is_live(date: &str, time: &str, now: DateTime<Utc>, offset: FixedOffset) -> bool {
    let Some(start) = event_start(date, time, offset) else {
        warn!("Invalid event date/time: {} {}", date, time);
        return false;
    };
    let start = start.with_timezone(&Utc);
    start <= now && start >= now - Duration::hours(LIVE_WINDOW_HOURS)
}
