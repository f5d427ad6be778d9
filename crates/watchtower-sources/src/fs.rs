//! Filesystem-read boundary used by the memory adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Path, PathBuf};

/// Read-only filesystem access
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Last modification time
    async fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    /// Regular files directly inside `dir`, sorted by path
    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSource for LocalFs {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn modified(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let modified = tokio::fs::metadata(path).await?.modified()?;
        Ok(DateTime::<Utc>::from(modified))
    }

    async fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_file() {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_fs_lists_files_only() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("b.md"), "b").unwrap();
        std::fs::write(temp.path().join("a.md"), "a").unwrap();
        std::fs::create_dir(temp.path().join("nested")).unwrap();

        let files = LocalFs.list_files(temp.path()).await.unwrap();
        assert_eq!(files, vec![temp.path().join("a.md"), temp.path().join("b.md")]);
    }

    #[tokio::test]
    async fn test_local_fs_read_and_modified() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("note.md");
        std::fs::write(&path, "hello").unwrap();

        assert_eq!(LocalFs.read_to_string(&path).await.unwrap(), "hello");
        let age = Utc::now() - LocalFs.modified(&path).await.unwrap();
        assert!(age.num_seconds() < 60);
    }

    #[tokio::test]
    async fn test_local_fs_missing_dir_errors() {
        let temp = TempDir::new().unwrap();
        assert!(LocalFs.list_files(&temp.path().join("missing")).await.is_err());
    }
}
