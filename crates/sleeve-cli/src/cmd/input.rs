//! Input selection shared by the pipeline commands.
//!
//! Either a raw controller log (`--log`, records extracted from it) or
//! pre-extracted newline-delimited files (`--events`, `--versions`).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use sleeve_core::config::Config;

use crate::extract::split_log;

#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Raw controller log to extract event and version records from.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["events", "versions"])]
    pub log: Option<PathBuf>,

    /// Newline-delimited controller operation records.
    #[arg(long, value_name = "FILE")]
    pub events: Option<PathBuf>,

    /// Newline-delimited object version records.
    #[arg(long, value_name = "FILE")]
    pub versions: Option<PathBuf>,
}

/// Loaded record lines.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub events: Vec<String>,
    pub versions: Vec<String>,
}

impl Inputs {
    pub fn event_lines(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn version_lines(&self) -> impl Iterator<Item = &str> {
        self.versions.iter().map(String::as_str)
    }
}

impl InputArgs {
    /// True when some source of event records was given.
    pub const fn has_events(&self) -> bool {
        self.log.is_some() || self.events.is_some()
    }

    /// True when some source of version records was given.
    pub const fn has_versions(&self) -> bool {
        self.log.is_some() || self.versions.is_some()
    }

    /// Read every selected source.
    ///
    /// # Errors
    ///
    /// Returns an error if a selected file cannot be read.
    pub fn load(&self, config: &Config) -> Result<Inputs> {
        if let Some(path) = &self.log {
            let content = read(path)?;
            let extracted = split_log(&content, &config.extract);
            return Ok(Inputs {
                events: extracted.events,
                versions: extracted.versions,
            });
        }

        let events = match &self.events {
            Some(path) => lines(&read(path)?),
            None => Vec::new(),
        };
        let versions = match &self.versions {
            Some(path) => lines(&read(path)?),
            None => Vec::new(),
        };
        Ok(Inputs { events, versions })
    }
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn lines(content: &str) -> Vec<String> {
    content.lines().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_split_files() {
        let dir = TempDir::new().expect("tempdir");
        let events = dir.path().join("events.jsonl");
        fs::write(&events, "{\"a\":1}\n\n{\"b\":2}\n").expect("write");

        let args = InputArgs {
            events: Some(events),
            ..InputArgs::default()
        };
        assert!(args.has_events());
        assert!(!args.has_versions());

        let inputs = args.load(&Config::default()).expect("load");
        assert_eq!(inputs.events, ["{\"a\":1}", "", "{\"b\":2}"]);
        assert!(inputs.versions.is_empty());
    }

    #[test]
    fn log_is_extracted() {
        let dir = TempDir::new().expect("tempdir");
        let log = dir.path().join("controller.log");
        fs::write(
            &log,
            "noise\nI sleeveless {\"LogType\": \"sleeve:object-version\"}{\"v\":1}\n",
        )
        .expect("write");

        let args = InputArgs {
            log: Some(log),
            ..InputArgs::default()
        };
        let inputs = args.load(&Config::default()).expect("load");
        assert!(inputs.events.is_empty());
        assert_eq!(inputs.versions, ["{\"v\":1}"]);
    }

    #[test]
    fn missing_file_is_an_error() {
        let args = InputArgs {
            events: Some(PathBuf::from("/definitely/not/here.jsonl")),
            ..InputArgs::default()
        };
        let err = args.load(&Config::default()).expect_err("missing");
        assert!(err.to_string().contains("Failed to read"));
    }
}
