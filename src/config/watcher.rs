//! Configuration file watcher for hot reload.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::store::ConfigStore;

/// Quiet period used to coalesce the burst of events an editor save emits.
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches the configuration file and reloads the store on change.
///
/// The parent directory is watched rather than the file itself so that
/// editors which save by rename-and-replace keep triggering reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    store: ConfigStore,
}

impl ConfigWatcher {
    pub fn new(path: &Path, store: ConfigStore) -> Self {
        Self {
            path: path.to_path_buf(),
            store,
        }
    }

    /// Start watching. Must be called from within a Tokio runtime.
    ///
    /// Reload failures are logged and the last good configuration stays in
    /// place; they never reach the caller.
    pub fn spawn(self) -> Result<WatchHandle, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let file_name: Option<OsString> = self.path.file_name().map(|n| n.to_os_string());
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let notify_tx = tx.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event
                            .paths
                            .iter()
                            .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                    if relevant {
                        let _ = notify_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %self.path.display(), "Config watcher started");

        let path = self.path;
        let store = self.store;
        let task = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(DEBOUNCE).await;
                while rx.try_recv().is_ok() {}

                tracing::info!("Config file change detected, reloading...");
                let reload = {
                    let store = store.clone();
                    let path = path.clone();
                    tokio::task::spawn_blocking(move || store.reload_from(&path))
                };
                match reload.await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(
                        error = %e,
                        "Failed to reload config. Keeping current configuration."
                    ),
                    Err(e) => tracing::error!(error = %e, "Config reload task failed"),
                }
            }
            tracing::debug!("Config watcher stopped");
        });

        Ok(WatchHandle {
            _watcher: watcher,
            tx,
            task,
        })
    }
}

/// Keeps the watch alive; dropping it stops watching.
pub struct WatchHandle {
    _watcher: RecommendedWatcher,
    tx: mpsc::UnboundedSender<()>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Force a reload as if the file had changed (used for SIGHUP).
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// A cloneable trigger that outlives borrows of the handle.
    pub fn reload_trigger(&self) -> ReloadTrigger {
        ReloadTrigger {
            tx: self.tx.clone(),
        }
    }

    /// Stop watching and wait for the reload task to exit.
    pub async fn stop(self) {
        let WatchHandle { _watcher, tx, task } = self;
        drop(_watcher);
        drop(tx);
        task.abort();
        let _ = task.await;
    }
}

/// Requests a reload from a [`WatchHandle`].
#[derive(Debug, Clone)]
pub struct ReloadTrigger {
    tx: mpsc::UnboundedSender<()>,
}

impl ReloadTrigger {
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Arc;

    use crate::config::AppConfig;

    async fn wait_for<F: Fn(&AppConfig) -> bool>(store: &ConfigStore, f: F) -> bool {
        for _ in 0..100 {
            if f(&store.current()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[tokio::test]
    async fn manual_trigger_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[app]\nname = \"one\"\n").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        let handle = ConfigWatcher::new(&path, store.clone()).spawn().unwrap();

        // Bypass the file system notification and ask directly.
        let before: Arc<AppConfig> = store.current();
        fs::write(&path, "[app]\nname = \"two\"\n").unwrap();
        handle.trigger();

        assert!(wait_for(&store, |c| c.app.name == "two").await);
        assert_eq!(before.app.name, "one");
        handle.stop().await;
    }

    #[tokio::test]
    async fn bad_edit_keeps_last_good_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "[app]\nname = \"good\"\n").unwrap();

        let store = ConfigStore::load(&path).unwrap();
        let handle = ConfigWatcher::new(&path, store.clone()).spawn().unwrap();

        fs::write(&path, "[server]\nmax_connections = 0\n").unwrap();
        handle.trigger();
        tokio::time::sleep(DEBOUNCE * 5).await;
        assert_eq!(store.current().app.name, "good");

        fs::write(&path, "[app]\nname = \"fixed\"\n").unwrap();
        handle.trigger();
        assert!(wait_for(&store, |c| c.app.name == "fixed").await);
        handle.stop().await;
    }
}
