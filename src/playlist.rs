//! Playlist parsing
//!
//! A playlist is UTF-8 text with one `Artist - Title` entry per line. The failure
//! log uses the same format, so a failure log can be fed back in unchanged.

use crate::error::{Error, Result};
use crate::types::Track;
use std::collections::HashSet;
use std::path::Path;

/// Separator between artist and title
pub const SEPARATOR: &str = " - ";

/// Parse playlist text into unique tracks, preserving first-seen order
///
/// Lines are trimmed. Blank lines, exact duplicates and lines without
/// [`SEPARATOR`] are dropped. Everything after the first separator is the title.
///
/// # Examples
///
/// ```
/// use playlist_dl::playlist::parse_playlist;
///
/// let tracks = parse_playlist("A - B\nA - B\nC - D - E\n\n");
/// assert_eq!(tracks.len(), 2);
/// assert_eq!(tracks[1].title, "D - E");
/// ```
pub fn parse_playlist(content: &str) -> Vec<Track> {
    let mut seen = HashSet::new();
    let mut tracks = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || !seen.insert(line) {
            continue;
        }

        let Some((artist, title)) = line.split_once(SEPARATOR) else {
            tracing::debug!(line, "skipping playlist line without separator");
            continue;
        };

        tracks.push(Track::new(artist.trim(), title.trim(), line));
    }

    tracks
}

/// Read and parse a playlist file
///
/// # Errors
///
/// Returns [`Error::Playlist`] if the file cannot be read or is not valid UTF-8.
pub async fn read_playlist(path: impl AsRef<Path>) -> Result<Vec<Track>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| Error::Playlist {
            path: path.to_path_buf(),
            source,
        })?;

    let tracks = parse_playlist(&content);
    tracing::info!(?path, tracks = tracks.len(), "parsed playlist");
    Ok(tracks)
}
