//! Deterministic probe doubles for tests

use crate::fs::FileSource;
use crate::probe::{CommandOutput, CommandRunner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Answers commands from a fixed table keyed by the full command line
#[derive(Debug, Default)]
pub struct StaticRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl StaticRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, command_line: &str, output: CommandOutput) -> Self {
        self.responses.insert(command_line.to_string(), output);
        self
    }

    /// Command lines executed so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CommandRunner for StaticRunner {
    async fn execute(&self, command: &str, args: &[String]) -> CommandOutput {
        let mut line = command.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(line.clone());
        }
        self.responses
            .get(&line)
            .cloned()
            .unwrap_or_else(|| CommandOutput::failed(127, format!("{command}: command not found")))
    }
}

/// In-memory filesystem
#[derive(Debug, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, (String, DateTime<Utc>)>,
    dirs: BTreeSet<PathBuf>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file; its parent directory becomes listable
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: &str, modified: DateTime<Utc>) -> Self {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.dirs.insert(parent.to_path_buf());
        }
        self.files.insert(path, (content.to_string(), modified));
        self
    }

    pub fn with_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dirs.insert(path.into());
        self
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(io::ErrorKind::NotFound, path.display().to_string())
}

#[async_trait]
impl FileSource for MemoryFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files
            .get(path)
            .map(|(content, _)| content.clone())
            .ok_or_else(|| not_found(path))
    }

    async fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        self.files
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| not_found(path))
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        Ok(self
            .files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .cloned()
            .collect())
    }
}
