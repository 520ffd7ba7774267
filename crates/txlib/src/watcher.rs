//! Hot reload: file notifications feeding a single pending-reload slot.
//!
//! Unlike the `notify-debouncer-full` loop in es-fluent-cli's `watcher.rs`,
//! debouncing here is a scheduler thread with one cancellable deadline, so a
//! pending reload can be dropped when watching is switched off.

use crate::error::TxError;
use crossbeam_channel::{RecvTimeoutError, Sender};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as _};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

#[derive(Debug)]
enum Command {
    Trigger,
    Cancel,
    Shutdown,
}

/// Cloneable handle that (re)starts or cancels the pending reload.
#[derive(Clone, Debug)]
pub struct ReloadTrigger {
    tx: Sender<Command>,
}

impl ReloadTrigger {
    /// Starts the debounce interval, restarting it if a reload is pending.
    pub fn trigger(&self) {
        let _ = self.tx.send(Command::Trigger);
    }

    /// Drops the pending reload, if any. Safe to call repeatedly.
    pub fn cancel(&self) {
        let _ = self.tx.send(Command::Cancel);
    }
}

/// A background thread that runs `reload` once the debounce interval has
/// passed without a new trigger.
#[derive(Debug)]
pub struct ReloadScheduler {
    trigger: ReloadTrigger,
    pending: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ReloadScheduler {
    pub fn new<F>(debounce: Duration, reload: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded::<Command>();
        let pending = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&pending);

        let thread = thread::Builder::new()
            .name("txlib-reload".to_string())
            .spawn(move || {
                let mut deadline: Option<Instant> = None;
                loop {
                    let command = match deadline {
                        Some(at) => match rx.recv_deadline(at) {
                            Ok(command) => command,
                            Err(RecvTimeoutError::Timeout) => {
                                deadline = None;
                                flag.store(false, Ordering::SeqCst);
                                reload();
                                continue;
                            },
                            Err(RecvTimeoutError::Disconnected) => break,
                        },
                        None => match rx.recv() {
                            Ok(command) => command,
                            Err(_) => break,
                        },
                    };

                    match command {
                        Command::Trigger => {
                            deadline = Some(Instant::now() + debounce);
                            flag.store(true, Ordering::SeqCst);
                        },
                        Command::Cancel => {
                            deadline = None;
                            flag.store(false, Ordering::SeqCst);
                        },
                        Command::Shutdown => break,
                    }
                }
                tracing::debug!("Reload scheduler stopped");
            });

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start reload thread: {}", e);
                None
            },
        };

        Self {
            trigger: ReloadTrigger { tx },
            pending,
            thread,
        }
    }

    pub fn handle(&self) -> ReloadTrigger {
        self.trigger.clone()
    }

    pub fn trigger(&self) {
        self.trigger.trigger();
    }

    pub fn cancel(&self) {
        self.trigger.cancel();
    }

    /// `true` while a reload is waiting for its debounce interval.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        let _ = self.trigger.tx.send(Command::Shutdown);
        if let Some(handle) = self.thread.take() {
            // The reload callback may hold the last engine handle, in which
            // case the scheduler is dropped on its own thread.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

/// Watches the directories of loaded files and triggers a reload when one of
/// those files changes.
pub struct FileWatch {
    _watcher: RecommendedWatcher,
    files: Arc<BTreeSet<PathBuf>>,
}

impl std::fmt::Debug for FileWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatch").field("files", &self.files).finish()
    }
}

impl FileWatch {
    pub fn new<I>(files: I, trigger: ReloadTrigger) -> Result<Self, TxError>
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        let files: BTreeSet<PathBuf> = files.into_iter().map(|p| absolute(p.as_ref())).collect();
        let directories: BTreeSet<PathBuf> = files
            .iter()
            .filter_map(|p| p.parent().map(Path::to_path_buf))
            .collect();
        let files = Arc::new(files);

        let watched = Arc::clone(&files);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if event.kind.is_access() {
                    return;
                }
                if event.paths.iter().any(|p| watched.contains(&absolute(p))) {
                    tracing::debug!("Dictionary file changed: {:?}", event.paths);
                    trigger.trigger();
                }
            },
            Err(e) => tracing::warn!("File watch error: {}", e),
        })?;

        for dir in &directories {
            watcher.watch(dir, RecursiveMode::NonRecursive)?;
            tracing::debug!("Watching {}", dir.display());
        }

        Ok(Self {
            _watcher: watcher,
            files,
        })
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }
}

fn absolute(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    // Removed files can't be canonicalized; resolve through the parent.
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => {
            let parent = if parent.as_os_str().is_empty() {
                Path::new(".")
            } else {
                parent
            };
            parent
                .canonicalize()
                .map(|dir| dir.join(name))
                .unwrap_or_else(|_| path.to_path_buf())
        },
        _ => path.to_path_buf(),
    }
}
