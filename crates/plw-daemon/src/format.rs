//! Chat message rendering.
//!
//! Telegram legacy Markdown. Texts are user-facing and kept stable; tests pin
//! the exact strings.

use std::time::Duration;

use plw_runtime::TrackingStarted;
use plw_schemas::{DiffEvent, DiffKind, PlaylistId, TrackMeta};

/// One outgoing chat text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    /// Send with `parse_mode: Markdown`.
    pub markdown: bool,
}

impl Reply {
    pub fn markdown(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: true,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markdown: false,
        }
    }
}

/// How a diff event goes out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventMessage {
    Photo { photo_url: String, caption: Reply },
    Text(Reply),
}

pub const DEGRADED_REMOVAL: &str = "🗑️ A song was removed from the playlist";

pub fn render_event(event: &DiffEvent) -> EventMessage {
    let Some(meta) = event.meta.as_ref() else {
        return EventMessage::Text(Reply::plain(DEGRADED_REMOVAL));
    };
    let text = song_message(event.kind, &event.track_id, meta);
    match meta.artwork_url.as_deref() {
        Some(url) => EventMessage::Photo {
            photo_url: url.to_string(),
            caption: Reply::markdown(text),
        },
        None => EventMessage::Text(Reply::markdown(text)),
    }
}

fn song_message(kind: DiffKind, track_id: &str, meta: &TrackMeta) -> String {
    let (emoji, action) = match kind {
        DiffKind::Added => ("➕", "Added"),
        DiffKind::Removed => ("➖", "Removed"),
    };
    let url = meta
        .external_url
        .clone()
        .unwrap_or_else(|| format!("https://open.spotify.com/track/{track_id}"));

    format!(
        "{emoji} *Song {action}!*\n\n\
         🎵 *{name}*\n\
         👤 Artist: {artists}\n\
         💿 Album: {album}\n\
         ⏱ Duration: {duration}\n\n\
         [Listen on Spotify]({url})",
        name = meta.name,
        artists = meta.artist_line(),
        album = meta.album,
        duration = meta.duration_label(),
    )
}

/// "2 minutes", "1 minute", "90 seconds".
pub fn interval_label(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let mins = secs / 60;
        if mins == 1 {
            "1 minute".to_string()
        } else {
            format!("{mins} minutes")
        }
    } else if secs == 1 {
        "1 second".to_string()
    } else {
        format!("{secs} seconds")
    }
}

// ---------------------------------------------------------------------------
// Command replies
// ---------------------------------------------------------------------------

pub fn welcome() -> Reply {
    Reply::markdown(
        "🎵 *Welcome to Spotify Playlist Tracker!*\n\n\
         I track changes to your Spotify playlists and notify you when songs are added or removed!\n\n\
         Use /help to see all available commands.",
    )
}

pub fn help(interval: Duration) -> Reply {
    Reply::markdown(format!(
        "🎵 *Spotify Playlist Tracker - Commands*\n\n\
         *Setup Commands:*\n\
         /setplaylist <url> - Set Spotify playlist to track\n\
         • Accepts full URL or playlist ID\n\
         • Example: `/setplaylist https://open.spotify.com/playlist/...`\n\n\
         *Information Commands:*\n\
         /status - Check current tracking status\n\
         /help - Show this help message\n\n\
         *Utility Commands:*\n\
         /forcecheck - Manually check playlist now\n\
         /stop - Stop tracking in this chat\n\n\
         *Features:*\n\
         ✨ Automatic tracking every {every}\n\
         ➕ Notifications when songs are added\n\
         ➖ Notifications when songs are removed\n\
         💾 Remembers changes even when bot restarts\n\
         🎨 Beautiful messages with album art\n\n\
         *Quick Start:*\n\
         1️⃣ Use /setplaylist with your Spotify playlist URL\n\
         2️⃣ That's it! Changes will be posted here automatically\n\n\
         _Made with ❤️ for music lovers_",
        every = interval_label(interval)
    ))
}

pub fn missing_playlist_argument() -> Reply {
    Reply::markdown(
        "❌ Please provide a playlist URL or ID!\n\n\
         Usage: `/setplaylist <url_or_id>`\n\
         Example: `/setplaylist https://open.spotify.com/playlist/37i9dQZF1DX...`",
    )
}

pub fn invalid_reference() -> Reply {
    Reply::plain(
        "❌ Invalid playlist URL or ID!\n\
         Please provide either a Spotify playlist URL or playlist ID.",
    )
}

pub fn setting_up() -> Reply {
    Reply::plain("🔄 Setting up playlist tracking...")
}

pub fn tracking_started(started: &TrackingStarted, interval: Duration) -> Reply {
    let p = &started.playlist;
    let url = p
        .external_url
        .clone()
        .unwrap_or_else(|| p.playlist_id.share_url());
    Reply::markdown(format!(
        "✅ *Playlist Set Successfully!*\n\n\
         🎵 [{name}]({url})\n\
         👤 Owner: {owner}\n\
         📊 Total Tracks: {total}\n\
         ✅ Tracking: Active\n\n\
         I'll notify you here when songs are added or removed!\n\
         Checking every {every}.",
        name = p.name,
        owner = p.owner.as_deref().unwrap_or("unknown"),
        total = p.total_tracks,
        every = interval_label(interval),
    ))
}

pub fn playlist_not_found() -> Reply {
    Reply::plain(
        "❌ Playlist not found!\n\
         Make sure the playlist URL/ID is correct and the playlist is public.",
    )
}

pub fn error_line(err: &impl std::fmt::Display) -> Reply {
    Reply::plain(format!("❌ Error: {err}"))
}

pub fn no_playlist() -> Reply {
    Reply::markdown(
        "⚠️ *No playlist set!*\n\n\
         Use /setplaylist to start tracking a playlist.",
    )
}

/// `name` falls back to the playlist id when the catalog lookup failed.
pub fn status(
    playlist: &PlaylistId,
    name: Option<&str>,
    url: Option<&str>,
    track_count: usize,
    interval: Duration,
) -> Reply {
    let share = playlist.share_url();
    Reply::markdown(format!(
        "🎵 *Playlist Tracker Status*\n\n\
         *Current Playlist:*\n\
         [{name}]({url})\n\n\
         📊 Total Songs: {track_count}\n\
         ⏱ Check Interval: Every {every}\n\
         ✅ Status: Active",
        name = name.unwrap_or(playlist.as_str()),
        url = url.unwrap_or(share.as_str()),
        every = interval_label(interval),
    ))
}

pub fn checking() -> Reply {
    Reply::plain("🔄 Checking playlist for changes...")
}

pub fn check_complete() -> Reply {
    Reply::plain("✅ Check complete! Any changes have been posted.")
}

pub fn stopped() -> Reply {
    Reply::markdown(
        "🛑 *Tracking Stopped*\n\n\
         I'll no longer send updates to this chat.\n\
         Use /setplaylist to start tracking again.",
    )
}
