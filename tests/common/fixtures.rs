//! Playlists, configs and a fake `yt-dlp` for integration tests

use playlist_dl::{Config, RetryConfig};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Playlist with a duplicate, a blank line, a malformed line and a title containing the separator
pub const SAMPLE_PLAYLIST: &str = "\
Daft Punk - One More Time
Daft Punk - One More Time

Missing Artist - Lost Song
just some text without separator
Offline Band - No Signal
Sigur Rós - Hoppípolla - Live
";

/// Raw lines [`SAMPLE_PLAYLIST`] parses to, in order
pub const SAMPLE_TRACKS: &[&str] = &[
    "Daft Punk - One More Time",
    "Missing Artist - Lost Song",
    "Offline Band - No Signal",
    "Sigur Rós - Hoppípolla - Live",
];

/// Write `content` as `playlist.txt` inside `dir`
pub fn write_playlist(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("playlist.txt");
    std::fs::write(&path, content).unwrap();
    path
}

/// Quiet config with short retry delays and the failure log inside `dir`
pub fn test_config(dir: &TempDir, worker_count: usize) -> Config {
    Config {
        worker_count,
        retry: RetryConfig {
            max_retries: 1,
            base_delay: Duration::from_millis(5),
            ..RetryConfig::default()
        },
        failed_tracks_path: dir.path().join("failed.txt"),
        print_progress: false,
        ..Config::default()
    }
}

/// Lines currently in the failure log, sorted
pub fn failure_lines(dir: &TempDir) -> Vec<String> {
    let mut lines: Vec<String> = std::fs::read_to_string(dir.path().join("failed.txt"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

/// Shell script standing in for `yt-dlp`
///
/// Queries containing "Missing" fail with a not-found message, queries containing
/// "Offline" fail with a network message; everything else writes an `.mp3` temp
/// file from the `--output` template. Every query is appended to `calls.log`
/// next to the script.
#[cfg(unix)]
pub const FAKE_YT_DLP: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then echo 2024.01.01; exit 0; fi
out=""
query=""
while [ $# -gt 0 ]; do
  case "$1" in
    --output) out="$2"; shift 2 ;;
    ytsearch1:*) query="${1#ytsearch1:}"; shift ;;
    *) shift ;;
  esac
done
echo "$query" >> "$(dirname "$0")/calls.log"
echo "[youtube:search] Extracting URL: ytsearch1:$query"
case "$query" in
  *Missing*) echo "ERROR: [youtube] Unable to find video for query" >&2; exit 1 ;;
  *Offline*) echo "ERROR: Unable to download webpage: Connection refused" >&2; exit 1 ;;
esac
echo "[download] Downloading item 1 of 1" >&2
file=$(printf '%s' "$out" | sed 's/%(ext)s/mp3/')
printf 'audio' > "$file"
echo "[ExtractAudio] Destination: $file"
exit 0
"#;

/// Install [`FAKE_YT_DLP`] as an executable inside `dir`
#[cfg(unix)]
pub fn install_fake_tool(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    let path = bin.join("yt-dlp");
    std::fs::write(&path, FAKE_YT_DLP).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Queries the fake tool has seen, in call order
#[cfg(unix)]
pub fn fake_tool_calls(tool: &Path) -> Vec<String> {
    let log = tool.with_file_name("calls.log");
    std::fs::read_to_string(log)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
