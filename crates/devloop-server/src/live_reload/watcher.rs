//! Filesystem change watcher.

use std::path::PathBuf;
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::flags::RebuildState;
use crate::error::ServerError;

/// Marks a change pending on every mutation under the watched roots.
///
/// Watching stops when the value is dropped.
pub struct ChangeWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl ChangeWatcher {
    /// Start watching `roots` recursively.
    ///
    /// # Errors
    ///
    /// Returns an error if a root is not a directory or the watcher cannot be created.
    pub fn start(roots: &[PathBuf], state: Arc<RebuildState>) -> Result<Self, ServerError> {
        if let Some(missing) = roots.iter().find(|root| !root.is_dir()) {
            return Err(ServerError::WatchRootMissing(missing.clone()));
        }

        let mut watcher = notify::recommended_watcher(move |res| record_change(res, &state))?;
        for root in roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
            tracing::debug!(root = %root.display(), "Watching for changes");
        }

        Ok(Self {
            _watcher: watcher,
            roots: roots.to_vec(),
        })
    }

    /// Directories being watched.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Whether an event kind mutates the tree.
///
/// Access events are excluded: the bundler reading sources would otherwise
/// re-arm the loop after every cycle.
fn is_change(kind: EventKind) -> bool {
    matches!(
        kind,
        EventKind::Any | EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

/// Process a notify event result.
fn record_change(res: Result<Event, notify::Error>, state: &RebuildState) {
    match res {
        Ok(event) if is_change(event.kind) => {
            tracing::debug!(paths = ?event.paths, kind = ?event.kind, "Change detected");
            state.mark_changed();
        }
        Ok(_) => {}
        Err(err) => tracing::warn!(error = %err, "File watch error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_is_change_mutations() {
        assert!(is_change(EventKind::Create(CreateKind::File)));
        assert!(is_change(EventKind::Modify(ModifyKind::Any)));
        assert!(is_change(EventKind::Remove(RemoveKind::File)));
        assert!(is_change(EventKind::Any));
    }

    #[test]
    fn test_is_change_ignores_access() {
        assert!(!is_change(EventKind::Access(AccessKind::Any)));
        assert!(!is_change(EventKind::Other));
    }

    #[test]
    fn test_record_change_sets_flag() {
        let state = RebuildState::new();
        drop(state.try_start());

        record_change(
            Ok(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("src/main.ts"))),
            &state,
        );

        assert!(state.is_change_pending());
    }

    #[test]
    fn test_record_change_ignores_errors_and_access() {
        let state = RebuildState::new();
        drop(state.try_start());

        record_change(Ok(Event::new(EventKind::Access(AccessKind::Any))), &state);
        record_change(Err(notify::Error::generic("watch failed")), &state);

        assert!(!state.is_change_pending());
    }

    #[test]
    fn test_start_rejects_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("static");

        let result = ChangeWatcher::start(
            &[dir.path().to_path_buf(), missing.clone()],
            Arc::new(RebuildState::new()),
        );

        match result {
            Err(ServerError::WatchRootMissing(path)) => assert_eq!(path, missing),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected missing root error"),
        }
    }

    #[test]
    fn test_file_write_marks_change() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir(&src).unwrap();
        let state = Arc::new(RebuildState::new());
        drop(state.try_start());

        let watcher = ChangeWatcher::start(std::slice::from_ref(&src), Arc::clone(&state)).unwrap();
        assert_eq!(watcher.roots(), &[src.clone()]);

        std::fs::write(src.join("main.ts"), "export {};\n").unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !state.is_change_pending() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(state.is_change_pending());
    }
}
