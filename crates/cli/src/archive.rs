use std::path::{Path, PathBuf};
use std::sync::Arc;

use docrelay_llm::StatusObserver;
use tracing::{debug, warn};

/// Per-chunk copies of raw responses, kept as a recovery aid.
///
/// Writes are attempted a fixed number of times with no delay; a chunk
/// that still cannot be written is skipped.
pub struct ChunkArchive {
    dir: PathBuf,
    attempts: u32,
    observer: Arc<dyn StatusObserver>,
}

impl ChunkArchive {
    /// Fresh directory under the system temp dir.
    pub fn default_dir() -> PathBuf {
        std::env::temp_dir().join(format!("docrelay-{}", uuid::Uuid::new_v4()))
    }

    pub fn create(
        dir: PathBuf,
        attempts: u32,
        observer: Arc<dyn StatusObserver>,
    ) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            attempts: attempts.max(1),
            observer,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for the 1-based chunk `index`.
    pub fn path_for(&self, index: usize) -> PathBuf {
        self.dir.join(format!("chunk_{index:04}.md"))
    }

    /// Returns whether the chunk was written.
    pub fn store(&self, index: usize, text: &str) -> bool {
        let path = self.path_for(index);
        for attempt in 1..=self.attempts {
            match std::fs::write(&path, text) {
                Ok(()) => {
                    debug!(chunk = index, path = %path.display(), "Chunk archived");
                    return true;
                }
                Err(e) => {
                    warn!(chunk = index, attempt, error = %e, "Chunk archive write failed");
                    self.observer.notify(
                        &format!(
                            "Failed to save chunk {index} to {} (attempt {attempt}/{}): {e}",
                            path.display(),
                            self.attempts
                        ),
                        true,
                    );
                }
            }
        }
        self.observer.notify(
            &format!("Skipping saved copy of chunk {index}; continuing."),
            true,
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docrelay_llm::status::MemoryObserver;

    #[test]
    fn stores_numbered_files() {
        let observer = Arc::new(MemoryObserver::new());
        let dir = ChunkArchive::default_dir();
        let archive = ChunkArchive::create(dir.clone(), 3, observer.clone()).unwrap();

        assert!(archive.store(1, "first"));
        assert!(archive.store(12, "twelfth"));

        assert_eq!(std::fs::read_to_string(dir.join("chunk_0001.md")).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(dir.join("chunk_0012.md")).unwrap(), "twelfth");
        assert_eq!(observer.error_count(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn gives_up_after_fixed_attempts() {
        let observer = Arc::new(MemoryObserver::new());
        let dir = ChunkArchive::default_dir();
        let archive = ChunkArchive::create(dir.clone(), 3, observer.clone()).unwrap();

        // Replace the directory with a plain file so every write fails.
        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::write(&dir, "not a directory").unwrap();

        assert!(!archive.store(1, "lost"));
        assert_eq!(observer.starting_with("Failed to save chunk 1").len(), 3);
        assert_eq!(observer.starting_with("Skipping saved copy of chunk 1").len(), 1);
        assert_eq!(observer.error_count(), 4);
        std::fs::remove_file(&dir).ok();
    }
}
