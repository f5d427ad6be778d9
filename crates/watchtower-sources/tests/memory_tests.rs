use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use watchtower_core::MemoryKind;
use watchtower_sources::fake::MemoryFs;
use watchtower_sources::{FileSource, LocalFs, MemoryAdapter, SourceAdapter};

#[tokio::test]
async fn test_reads_core_docs_and_notes() {
    let modified = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let fs = MemoryFs::new()
        .with_file("/ws/SOUL.md", "soul", modified)
        .with_file("/ws/USER.md", "user", modified)
        .with_file("/ws/MEMORY.md", "memory", modified)
        .with_file("/ws/memory/2024-05-01.md", "note", modified)
        .with_file("/ws/memory/image.png", "binary", modified);

    let snapshot = MemoryAdapter::new(Arc::new(fs), "/ws").collect().await;

    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.data.len(), 4);
    let note = snapshot.data.iter().find(|d| d.kind == MemoryKind::Memory).unwrap();
    assert_eq!(note.path, "/ws/memory/2024-05-01.md");
    assert_eq!(note.updated_at, modified);
    assert_eq!(snapshot.metadata.source_ref, "/ws");
}

#[tokio::test]
async fn test_missing_docs_and_dir_both_warn() {
    let fs = MemoryFs::new().with_file("/ws/USER.md", "user", Utc::now());

    let snapshot = MemoryAdapter::new(Arc::new(fs), "/ws").collect().await;

    assert_eq!(
        snapshot.warnings,
        vec![
            "missing_core_doc:SOUL.md",
            "missing_core_doc:MEMORY.md",
            "memory_dir_unavailable"
        ]
    );
    assert_eq!(snapshot.data.len(), 1);
}

#[tokio::test]
async fn test_local_workspace() {
    let temp = TempDir::new().unwrap();
    for name in ["SOUL.md", "USER.md", "MEMORY.md"] {
        std::fs::write(temp.path().join(name), format!("# {name}")).unwrap();
    }
    std::fs::create_dir(temp.path().join("memory")).unwrap();

    let snapshot = MemoryAdapter::new(Arc::new(LocalFs), temp.path())
        .collect()
        .await;

    assert!(snapshot.warnings.is_empty());
    assert_eq!(snapshot.data.len(), 3);
    assert!(snapshot.data.iter().all(|d| d.kind == MemoryKind::Core));
}

/// A filesystem that answers only after a delay
struct StalledFs {
    delay: Duration,
    inner: MemoryFs,
}

#[async_trait]
impl FileSource for StalledFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.read_to_string(path).await
    }

    async fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        self.inner.modified(path).await
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_files(dir).await
    }
}

#[tokio::test(start_paused = true)]
async fn test_stalled_reads_time_out_as_warnings() {
    let inner = MemoryFs::new()
        .with_file("/ws/SOUL.md", "soul", Utc::now())
        .with_dir("/ws/memory");
    let fs = StalledFs {
        delay: Duration::from_secs(60),
        inner,
    };

    let started = tokio::time::Instant::now();
    let snapshot = MemoryAdapter::new(Arc::new(fs), "/ws")
        .with_timeout(Duration::from_millis(250))
        .collect()
        .await;

    assert!(snapshot.data.is_empty());
    assert_eq!(
        snapshot.warnings,
        vec![
            "missing_core_doc:SOUL.md",
            "missing_core_doc:USER.md",
            "missing_core_doc:MEMORY.md",
            "memory_dir_unavailable"
        ]
    );
    assert!(started.elapsed() < Duration::from_secs(60));
}

#[tokio::test(start_paused = true)]
async fn test_slow_reads_within_timeout_succeed() {
    let inner = MemoryFs::new().with_file("/ws/SOUL.md", "soul", Utc::now());
    let fs = StalledFs {
        delay: Duration::from_millis(50),
        inner,
    };

    let snapshot = MemoryAdapter::new(Arc::new(fs), "/ws")
        .with_timeout(Duration::from_secs(1))
        .collect()
        .await;

    assert_eq!(snapshot.data.len(), 1);
    assert_eq!(snapshot.data[0].content, "soul");
}
