//! Utility functions for filenames and output-directory housekeeping

use std::path::{Path, PathBuf};
use tokio::fs;

/// Audio extensions recognized as a completed track, in lookup order
pub const AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".webm", ".m4a", ".ogg", ".opus"];

/// Suffix appended to every file the tool writes until the attempt is finalized
pub const TEMP_SUFFIX: &str = ".tmp";

/// Suffix the tool itself uses for partially transferred files
const PART_SUFFIX: &str = ".part";

/// Maximum filename base length in Unicode code points
pub const MAX_FILENAME_CHARS: usize = 100;

const INVALID_FILENAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\n', '\r', '\t'];

/// Make a string safe to use as a filename base
///
/// Replaces characters that are invalid on common filesystems with `_`, trims
/// surrounding whitespace and truncates to [`MAX_FILENAME_CHARS`] code points.
///
/// # Examples
///
/// ```
/// use playlist_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("AC/DC - Back In Black"), "AC_DC - Back In Black");
/// assert_eq!(sanitize_filename("  What? - Why: <1>  "), "What_ - Why_ _1_");
/// ```
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if INVALID_FILENAME_CHARS.contains(&c) { '_' } else { c })
        .collect();

    replaced.trim().chars().take(MAX_FILENAME_CHARS).collect()
}

/// Output template handed to the tool; `%(ext)s` is filled in by the tool
pub fn output_template(output_dir: &Path, safe_name: &str) -> PathBuf {
    output_dir.join(format!("{safe_name}.%(ext)s{TEMP_SUFFIX}"))
}

/// Final path for a base name and extension (extension includes the dot)
pub fn final_path(output_dir: &Path, safe_name: &str, ext: &str) -> PathBuf {
    output_dir.join(format!("{safe_name}{ext}"))
}

/// Temporary path for a base name and extension
pub fn temp_path(output_dir: &Path, safe_name: &str, ext: &str) -> PathBuf {
    output_dir.join(format!("{safe_name}{ext}{TEMP_SUFFIX}"))
}

/// Find an already completed file for `safe_name`, trying each recognized extension
pub async fn find_existing(output_dir: &Path, safe_name: &str) -> Option<PathBuf> {
    for ext in AUDIO_EXTENSIONS {
        let path = final_path(output_dir, safe_name, ext);
        if fs::metadata(&path).await.is_ok() {
            return Some(path);
        }
    }
    None
}

/// Find a finished temp file for `safe_name`, returning `(temp, final)` paths
pub async fn find_temp(output_dir: &Path, safe_name: &str) -> Option<(PathBuf, PathBuf)> {
    for ext in AUDIO_EXTENSIONS {
        let temp = temp_path(output_dir, safe_name, ext);
        if fs::metadata(&temp).await.is_ok() {
            return Some((temp, final_path(output_dir, safe_name, ext)));
        }
    }
    None
}

/// Remove temp files left behind for one base name by an earlier, interrupted attempt
///
/// Only the exact temp names for `safe_name` are touched, so tracks whose names share
/// a prefix are unaffected. Returns the number of files removed.
pub async fn purge_stale_temp(output_dir: &Path, safe_name: &str) -> usize {
    let mut removed = 0;
    for ext in AUDIO_EXTENSIONS {
        let temp = temp_path(output_dir, safe_name, ext);
        let mut part = temp.clone().into_os_string();
        part.push(PART_SUFFIX);

        for path in [temp, PathBuf::from(part)] {
            match fs::remove_file(&path).await {
                Ok(()) => {
                    tracing::debug!(?path, "removed stale temp file");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(?path, error = %e, "failed to remove stale temp file");
                }
            }
        }
    }
    removed
}

/// Whether a directory entry name looks like an unfinished download
fn is_temp_name(name: &str) -> bool {
    name.ends_with(TEMP_SUFFIX) || name.ends_with(&format!("{TEMP_SUFFIX}{PART_SUFFIX}"))
}

/// Remove every unfinished download from `output_dir`
///
/// Errors on individual files are logged as warnings and do not stop the sweep.
/// Returns the number of files removed.
///
/// # Errors
///
/// Returns an error only if the directory itself cannot be listed.
pub async fn cleanup_temp_files(output_dir: &Path) -> std::io::Result<usize> {
    let mut entries = fs::read_dir(output_dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_temp_name(name) {
            continue;
        }

        let path = entry.path();
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(file = name, "removed incomplete download");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "error removing temp file");
            }
        }
    }

    if removed > 0 {
        tracing::info!(removed, "cleaned up incomplete downloads");
    }

    Ok(removed)
}
