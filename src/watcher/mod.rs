//! Watching open entity files for external changes.
//!
//! Uses notify; each watched file gets its own trailing-edge debounce so a
//! burst of writes from another process reloads once.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver};

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::editor::ChangeDebouncer;

struct Target {
    path: PathBuf,
    name: Option<OsString>,
    root: PathBuf,
    debouncer: ChangeDebouncer,
}

impl Target {
    fn matches(&self, event: &Event) -> bool {
        event.paths.iter().any(|path| {
            path == &self.root
                || path == &self.path
                || self
                    .name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

/// Watches a set of files and reports debounced changes.
pub struct FileWatcher {
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<Event>>,
    roots: Vec<PathBuf>,
    targets: Vec<Target>,
    debounce_ms: u64,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("roots", &self.roots)
            .field("targets", &self.targets.iter().map(|t| &t.path).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a watcher with nothing watched yet.
    ///
    /// # Errors
    /// Returns an error if the platform watcher cannot be created.
    pub fn new(debounce_ms: u64) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();
        let watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        Ok(Self {
            watcher,
            rx,
            roots: Vec::new(),
            targets: Vec::new(),
            debounce_ms,
        })
    }

    /// Start watching `path`. Watching the same file twice is a no-op.
    ///
    /// # Errors
    /// Returns an error if the file's directory cannot be watched.
    pub fn add(&mut self, path: impl AsRef<Path>) -> notify::Result<()> {
        // Event paths from the OS are absolute and canonical.
        let path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        if self.targets.iter().any(|t| t.path == path) {
            return Ok(());
        }
        let root = watch_root_for(&path);
        if !self.roots.contains(&root) {
            self.watcher.watch(&root, RecursiveMode::NonRecursive)?;
            self.roots.push(root.clone());
        }
        self.targets.push(Target {
            name: path.file_name().map(std::ffi::OsStr::to_os_string),
            path,
            root,
            debouncer: ChangeDebouncer::new(self.debounce_ms),
        });
        Ok(())
    }

    /// Stop reporting changes for `path`.
    pub fn remove(&mut self, path: impl AsRef<Path>) {
        let path = path
            .as_ref()
            .canonicalize()
            .unwrap_or_else(|_| path.as_ref().to_path_buf());
        self.targets.retain(|t| t.path != path);
        let (keep, drop): (Vec<PathBuf>, Vec<PathBuf>) = std::mem::take(&mut self.roots)
            .into_iter()
            .partition(|root| self.targets.iter().any(|t| &t.root == root));
        for root in &drop {
            let _ = self.watcher.unwatch(root);
        }
        self.roots = keep;
    }

    /// Canonical paths of every watched file.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.targets.iter().map(|t| t.path.clone()).collect()
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.targets.iter().any(|t| t.path == path)
    }

    /// Drain pending events and return the files whose change settled.
    pub fn poll(&mut self, now_ms: u64) -> Vec<PathBuf> {
        let mut total = 0u32;
        while let Ok(event) = self.rx.try_recv() {
            total += 1;
            match event {
                Ok(ev) => {
                    let mut relevant = false;
                    for target in self.targets.iter_mut().filter(|t| t.matches(&ev)) {
                        target.debouncer.queue(now_ms);
                        relevant = true;
                    }
                    if !relevant {
                        crate::perf::log_event(
                            "watcher.irrelevant",
                            format!("kind={:?} paths={:?}", ev.kind, ev.paths),
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "file watcher error");
                    crate::perf::log_event("watcher.error", format!("{err}"));
                }
            }
        }
        if total > 0 {
            crate::perf::log_event("watcher.poll", format!("events={total}"));
        }
        self.targets
            .iter_mut()
            .filter_map(|t| t.debouncer.take_ready(now_ms).then(|| t.path.clone()))
            .collect()
    }

    pub fn has_pending(&self) -> bool {
        self.targets.iter().any(|t| t.debouncer.is_pending())
    }
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::EventKind;
    use std::time::{Duration, Instant};
    use tempfile::tempdir;

    fn dir_event(path: PathBuf) -> Event {
        Event {
            kind: EventKind::Any,
            paths: vec![path],
            attrs: notify::event::EventAttributes::new(),
        }
    }

    #[test]
    fn test_directory_level_event_matches_every_file_in_it() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let a = canonical_dir.join("a.json");
        let b = canonical_dir.join("b.json");
        std::fs::write(&a, "{}").expect("write");
        std::fs::write(&b, "{}").expect("write");
        let mut watcher = FileWatcher::new(10).expect("watcher");
        watcher.add(&a).expect("add");
        watcher.add(&b).expect("add");
        assert_eq!(watcher.roots.len(), 1);

        let event = dir_event(canonical_dir);
        assert!(watcher.targets.iter().all(|t| t.matches(&event)));
    }

    #[test]
    fn test_add_twice_is_noop_and_remove_unwatches_root() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("entity.json");
        std::fs::write(&path, "{}").expect("write");
        let mut watcher = FileWatcher::new(10).expect("watcher");
        watcher.add(&path).expect("add");
        watcher.add(&path).expect("add");
        assert_eq!(watcher.targets.len(), 1);
        assert!(watcher.is_watching(&path));

        watcher.remove(&path);
        assert!(!watcher.is_watching(&path));
        assert!(watcher.roots.is_empty());
    }

    #[test]
    fn test_poll_reports_settled_files_once() {
        let dir = tempdir().expect("tempdir");
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, "{}").expect("write");
        std::fs::write(&b, "{}").expect("write");
        let mut watcher = FileWatcher::new(100).expect("watcher");
        watcher.add(&a).expect("add");
        watcher.add(&b).expect("add");

        watcher.targets[1].debouncer.queue(1_000);
        assert!(watcher.has_pending());
        assert!(watcher.poll(1_050).is_empty());
        assert_eq!(watcher.poll(1_100), vec![watcher.targets[1].path.clone()]);
        assert!(watcher.poll(1_200).is_empty());
        assert!(!watcher.has_pending());
    }

    #[test]
    fn test_watch_root_for_relative_file_is_dot() {
        let root = watch_root_for(Path::new("entity.json"));
        assert_eq!(root, PathBuf::from("."));
    }

    #[test]
    fn test_real_file_modification_detected() {
        let dir = tempdir().expect("tempdir");
        let canonical_dir = dir.path().canonicalize().expect("canonicalize");
        let path = canonical_dir.join("watched.json");
        std::fs::write(&path, "{}").expect("write");

        let mut watcher = FileWatcher::new(50).expect("watcher");
        watcher.add(&path).expect("add");

        // Give the backend time to register the watch
        std::thread::sleep(Duration::from_millis(500));
        std::fs::write(&path, r#"{"id": "urn:x"}"#).expect("write");

        let start = Instant::now();
        let deadline = start + Duration::from_secs(5);
        let mut changed = Vec::new();
        while Instant::now() < deadline && changed.is_empty() {
            let now_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
            changed = watcher.poll(now_ms);
            std::thread::sleep(Duration::from_millis(50));
        }

        assert_eq!(changed, vec![path]);
    }
}
