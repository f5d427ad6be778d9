//! Workspace memory reader

use crate::base::SourceAdapter;
use crate::fs::FileSource;
use async_trait::async_trait;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use watchtower_core::{
    CollectedSnapshot, MemoryDocRecord, MemoryKind, SourceMetadata, SourceType, Transport,
};

/// Core documents, read by exact name from the workspace root
pub const CORE_DOCS: [&str; 3] = ["SOUL.md", "USER.md", "MEMORY.md"];

const MEMORY_DIR: &str = "memory";

const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

pub struct MemoryAdapter {
    fs: Arc<dyn FileSource>,
    workspace_root: PathBuf,
    timeout: Duration,
}

impl MemoryAdapter {
    pub fn new(fs: Arc<dyn FileSource>, workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            workspace_root: workspace_root.into(),
            timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Bound every filesystem call; an elapsed read fails like a missing file
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn bounded<T>(&self, read: impl Future<Output = io::Result<T>>) -> io::Result<T> {
        match tokio::time::timeout(self.timeout, read).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("timed out after {}ms", self.timeout.as_millis()),
            )),
        }
    }

    async fn read_doc(&self, path: &Path, kind: MemoryKind) -> io::Result<MemoryDocRecord> {
        let content = self.bounded(self.fs.read_to_string(path)).await?;
        let updated_at = self.bounded(self.fs.modified(path)).await?;
        Ok(MemoryDocRecord {
            path: path.display().to_string(),
            kind,
            updated_at,
            content,
        })
    }
}

#[async_trait]
impl SourceAdapter for MemoryAdapter {
    type Data = Vec<MemoryDocRecord>;

    fn source_type(&self) -> SourceType {
        SourceType::Memory
    }

    async fn collect(&self) -> CollectedSnapshot<Vec<MemoryDocRecord>> {
        let metadata = SourceMetadata::new(
            SourceType::Memory,
            Transport::Filesystem,
            self.workspace_root.display().to_string(),
        );
        let mut docs = Vec::new();
        let mut warnings = Vec::new();

        for name in CORE_DOCS {
            match self.read_doc(&self.workspace_root.join(name), MemoryKind::Core).await {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    tracing::debug!(doc = name, error = %e, "core doc unreadable");
                    warnings.push(format!("missing_core_doc:{name}"));
                }
            }
        }

        let memory_dir = self.workspace_root.join(MEMORY_DIR);
        match self.bounded(self.fs.list_files(&memory_dir)).await {
            Ok(files) => {
                for path in files {
                    if path.extension().and_then(|e| e.to_str()) != Some("md") {
                        continue;
                    }
                    match self.read_doc(&path, MemoryKind::Memory).await {
                        Ok(doc) => docs.push(doc),
                        Err(e) => {
                            tracing::debug!(path = %path.display(), error = %e, "memory note unreadable");
                        }
                    }
                }
            }
            Err(_) => warnings.push("memory_dir_unavailable".to_string()),
        }

        CollectedSnapshot {
            metadata,
            data: docs,
            warnings,
        }
    }
}
