//! Tool resolution
//!
//! The tool is preferred as a program on its own (`yt-dlp`). If a `--version`
//! probe of that fails, the module-execution form through an interpreter
//! (`python -m yt_dlp`) is tried. An explicit binary path disables discovery.

use crate::config::ToolConfig;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// A resolved way to invoke the tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Program to execute
    pub program: PathBuf,
    /// Arguments placed before the tool's own arguments (e.g. `-m yt_dlp`)
    pub prefix_args: Vec<String>,
}

impl ToolCommand {
    /// Invoke a program directly
    pub fn direct(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            prefix_args: Vec::new(),
        }
    }

    /// Invoke a module through an interpreter (`<interpreter> -m <module>`)
    pub fn module(interpreter: impl Into<PathBuf>, module: &str) -> Self {
        Self {
            program: interpreter.into(),
            prefix_args: vec!["-m".to_string(), module.to_string()],
        }
    }

    /// A fresh [`Command`] with the prefix arguments applied
    ///
    /// The child is killed if the returned command's child handle is dropped.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.prefix_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    /// Whether `<command> --version` runs and exits successfully
    pub async fn probe(&self) -> bool {
        let status = self
            .command()
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) => status.success(),
            Err(e) => {
                tracing::debug!(tool = %self, error = %e, "tool probe failed to start");
                false
            }
        }
    }
}

impl std::fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.prefix_args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Locate `name` on PATH when searching is enabled, otherwise leave it to the OS
fn locate(name: &str, search_path: bool) -> Option<PathBuf> {
    if !search_path {
        return Some(PathBuf::from(name));
    }
    match which::which(name) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::debug!(name, error = %e, "not found in PATH");
            None
        }
    }
}

/// Candidate invocations in preference order
pub fn candidates(config: &ToolConfig) -> Vec<ToolCommand> {
    if let Some(path) = &config.binary_path {
        return vec![ToolCommand::direct(path.clone())];
    }

    let direct = locate(&config.program, config.search_path).map(ToolCommand::direct);
    let via_interpreter = config
        .interpreters
        .iter()
        .filter_map(|interp| locate(interp, config.search_path))
        .map(|interp| ToolCommand::module(interp, &config.module));

    direct.into_iter().chain(via_interpreter).collect()
}

/// Resolve the tool by probing each candidate in order
///
/// # Errors
///
/// Returns [`Error::ToolNotFound`] if no candidate answers `--version`.
pub async fn resolve(config: &ToolConfig) -> Result<ToolCommand> {
    let candidates = candidates(config);

    for candidate in &candidates {
        if candidate.probe().await {
            tracing::info!(tool = %candidate, "resolved acquisition tool");
            return Ok(candidate.clone());
        }
        tracing::debug!(tool = %candidate, "tool candidate did not answer --version");
    }

    let tried: Vec<String> = candidates.iter().map(ToString::to_string).collect();
    Err(Error::ToolNotFound(format!(
        "{} not found (tried: {}). Please install it: pip install {}",
        config.program,
        if tried.is_empty() {
            "nothing on PATH".to_string()
        } else {
            tried.join(", ")
        },
        config.program
    )))
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_binary_path_is_the_only_candidate() {
        let config = ToolConfig {
            binary_path: Some(PathBuf::from("/opt/yt-dlp")),
            ..Default::default()
        };
        assert_eq!(candidates(&config), vec![ToolCommand::direct("/opt/yt-dlp")]);
    }

    #[test]
    fn without_path_search_names_are_used_verbatim() {
        let config = ToolConfig {
            search_path: false,
            interpreters: vec!["python3".to_string()],
            ..Default::default()
        };
        assert_eq!(
            candidates(&config),
            vec![
                ToolCommand::direct("yt-dlp"),
                ToolCommand::module("python3", "yt_dlp"),
            ]
        );
    }

    #[test]
    fn missing_programs_are_not_candidates() {
        let config = ToolConfig {
            program: "nonexistent-tool-binary-xyz".to_string(),
            interpreters: vec!["nonexistent-python-xyz".to_string()],
            ..Default::default()
        };
        assert!(candidates(&config).is_empty());
    }

    #[test]
    fn display_includes_prefix_args() {
        let cmd = ToolCommand::module("python", "yt_dlp");
        assert_eq!(cmd.to_string(), "python -m yt_dlp");
    }

    #[tokio::test]
    async fn resolve_fails_with_tool_not_found() {
        let config = ToolConfig {
            binary_path: Some(PathBuf::from("/nonexistent/path/to/yt-dlp")),
            ..Default::default()
        };
        match resolve(&config).await {
            Err(Error::ToolNotFound(msg)) => {
                assert!(msg.contains("/nonexistent/path/to/yt-dlp"), "got: {msg}");
            }
            other => panic!("expected ToolNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn probe_of_missing_binary_is_false() {
        assert!(!ToolCommand::direct("/nonexistent/yt-dlp").probe().await);
    }

    #[cfg(unix)]
    #[tokio::test]
    #[serial_test::serial]
    async fn falls_back_to_interpreter_form() {
        use std::os::unix::fs::PermissionsExt;

        // A fake interpreter that only answers `-m yt_dlp --version`
        let dir = tempfile::TempDir::new().unwrap();
        let interp = dir.path().join("fake-python");
        std::fs::write(
            &interp,
            "#!/bin/sh\n[ \"$1\" = \"-m\" ] && [ \"$2\" = \"yt_dlp\" ] && [ \"$3\" = \"--version\" ] && exit 0\nexit 1\n",
        )
        .unwrap();
        std::fs::set_permissions(&interp, std::fs::Permissions::from_mode(0o755)).unwrap();

        let config = ToolConfig {
            program: "nonexistent-tool-binary-xyz".to_string(),
            interpreters: vec![interp.to_string_lossy().into_owned()],
            search_path: false,
            ..Default::default()
        };

        let resolved = resolve(&config).await.unwrap();
        assert_eq!(resolved, ToolCommand::module(interp, "yt_dlp"));
    }
}
