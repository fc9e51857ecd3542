//! File watching for module source files.

use crate::error::{ReloadError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

/// Watches module source files and reports which ones changed.
///
/// Uses the `notify` crate. Bursts of events for the same path within the
/// debounce window collapse into one trailing notification.
///
/// # Examples
///
/// ```rust,no_run
/// use hot_reloader::notify::SourceWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (watcher, mut rx) = SourceWatcher::new(Duration::from_millis(200))?;
/// watcher.watch("src/modules/weapons.lua").await?;
///
/// while let Some(path) = rx.recv().await {
///     println!("{} changed", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct SourceWatcher {
    watcher: Arc<tokio::sync::Mutex<RecommendedWatcher>>,
    debounce_duration: Duration,
    watched_paths: Arc<tokio::sync::Mutex<Vec<PathBuf>>>,
}

impl SourceWatcher {
    /// Create a new source watcher.
    ///
    /// Returns the watcher and a receiver that yields the canonical path of
    /// every changed file.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying file watcher cannot be created.
    pub fn new(debounce_duration: Duration) -> Result<(Self, mpsc::Receiver<PathBuf>)> {
        let (tx, rx) = mpsc::channel(100);
        let debounce = debounce_duration;

        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PathBuf>();

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_)
                ) {
                    for path in event.paths {
                        let _ = event_tx.send(path);
                    }
                }
            }
        })
        .map_err(|e| ReloadError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        tokio::spawn(async move {
            // Per path: when the pending trailing notification fires.
            let mut pending: HashMap<PathBuf, Instant> = HashMap::new();

            while let Some(path) = event_rx.recv().await {
                let now = Instant::now();
                pending.retain(|_, due| *due > now);
                if pending.contains_key(&path) {
                    continue;
                }
                pending.insert(path.clone(), now + debounce);

                let sender = tx.clone();
                tokio::spawn(async move {
                    sleep(debounce).await;
                    let _ = sender.send(path).await;
                });

                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok((
            Self {
                watcher: Arc::new(tokio::sync::Mutex::new(watcher)),
                debounce_duration,
                watched_paths: Arc::new(tokio::sync::Mutex::new(Vec::new())),
            },
            rx,
        ))
    }

    /// Add a file to watch.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or watched.
    pub async fn watch(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let canonical_path = path
            .as_ref()
            .canonicalize()
            .map_err(|e| ReloadError::WatchError(format!("Failed to resolve path: {}", e)))?;

        let mut watcher = self.watcher.lock().await;
        watcher
            .watch(&canonical_path, RecursiveMode::NonRecursive)
            .map_err(|e| ReloadError::WatchError(format!("Failed to watch path: {}", e)))?;

        let mut paths = self.watched_paths.lock().await;
        if !paths.contains(&canonical_path) {
            paths.push(canonical_path.clone());
        }
        tracing::debug!(path = %canonical_path.display(), "watching source file");

        Ok(canonical_path)
    }

    /// Stop watching a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be resolved or unwatched.
    pub async fn unwatch(&self, path: impl AsRef<Path>) -> Result<()> {
        let canonical_path = path.as_ref().canonicalize().map_err(|e| {
            ReloadError::WatchError(format!("Failed to resolve path for unwatching: {}", e))
        })?;

        let mut watcher = self.watcher.lock().await;
        watcher
            .unwatch(&canonical_path)
            .map_err(|e| ReloadError::WatchError(format!("Failed to unwatch path: {}", e)))?;

        let mut paths = self.watched_paths.lock().await;
        paths.retain(|p| p != &canonical_path);

        Ok(())
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }

    /// Get a list of currently watched paths.
    pub async fn watched_paths(&self) -> Vec<PathBuf> {
        self.watched_paths.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_watcher_creation() {
        let result = SourceWatcher::new(Duration::from_millis(100));
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_watch_nonexistent_file() {
        let (watcher, _rx) = SourceWatcher::new(Duration::from_millis(100)).unwrap();
        let result = watcher.watch("/nonexistent/weapons.lua").await;
        assert!(matches!(result, Err(ReloadError::WatchError(_))));
    }

    #[tokio::test]
    async fn test_file_change_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let source_path = temp_dir.path().join("weapons.lua");
        fs::write(&source_path, "damage = 10").unwrap();

        let (watcher, mut rx) = SourceWatcher::new(Duration::from_millis(50)).unwrap();
        let canonical = watcher.watch(&source_path).await.unwrap();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            fs::write(&source_path, "damage = 12").unwrap();
        });

        let received = timeout(Duration::from_secs(2), rx.recv()).await;
        let path = received.unwrap().unwrap();
        assert_eq!(path.canonicalize().unwrap(), canonical);
    }

    #[tokio::test]
    async fn test_burst_of_writes_collapses_to_one_notification() {
        let temp_dir = TempDir::new().unwrap();
        let source_path = temp_dir.path().join("weapons.lua");
        fs::write(&source_path, "damage = 10").unwrap();

        let (watcher, mut rx) = SourceWatcher::new(Duration::from_millis(300)).unwrap();
        let canonical = watcher.watch(&source_path).await.unwrap();

        for damage in 11..16 {
            fs::write(&source_path, format!("damage = {damage}")).unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let path = timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.canonicalize().unwrap(), canonical);

        let extra = timeout(Duration::from_millis(600), rx.recv()).await;
        assert!(extra.is_err(), "burst produced more than one notification");
    }

    #[tokio::test]
    async fn test_unwatch() {
        let temp_dir = TempDir::new().unwrap();
        let source_path = temp_dir.path().join("weapons.lua");
        fs::write(&source_path, "damage = 10").unwrap();

        let (watcher, _rx) = SourceWatcher::new(Duration::from_millis(100)).unwrap();
        watcher.watch(&source_path).await.unwrap();
        assert_eq!(watcher.watched_paths().await.len(), 1);

        watcher.unwatch(&source_path).await.unwrap();
        assert!(watcher.watched_paths().await.is_empty());
    }

    #[tokio::test]
    async fn test_debounce_duration() {
        let duration = Duration::from_millis(500);
        let (watcher, _rx) = SourceWatcher::new(duration).unwrap();
        assert_eq!(watcher.debounce_duration(), duration);
    }
}
