use super::*;
use crate::downloader::test_helpers::{
    ScriptedTool, Step, create_test_downloader, music_dir, test_config,
};
use crate::error::Error;
use crate::types::{Event, FailureReason, Track, TrackStatus};
use std::time::Duration;
use tempfile::TempDir;


fn track(raw: &str) -> Track {
    let (artist, title) = raw.split_once(" - ").unwrap();
    Track::new(artist, title, raw)
}

fn tracks(raws: &[&str]) -> Vec<Track> {
    raws.iter().map(|raw| track(raw)).collect()
}

fn failure_lines(temp_dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(temp_dir.path().join("failed.txt"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn drain_events(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
