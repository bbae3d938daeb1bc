use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};

/// What the watcher reports back to the REPL thread
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The watched script was written or replaced
    Changed(PathBuf),
    Error(String),
}

/// Watches one script file from notify's own threads
///
/// The parent directory is watched rather than the file, so editors that save
/// by writing a temp file and renaming it over the original are still seen.
pub struct ScriptWatcher {
    watcher: RecommendedWatcher,
    script: PathBuf,
}

impl ScriptWatcher {
    pub fn new(path: impl AsRef<Path>, tx: Sender<WatchEvent>) -> notify::Result<Self> {
        let script = absolute(path.as_ref());
        let filter = script.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) if touches_script(&event, &filter) => WatchEvent::Changed(filter.clone()),
                Ok(_) => return,
                Err(e) => WatchEvent::Error(e.to_string()),
            };
            // Receiver dropped means the REPL is shutting down
            let _ = tx.send(event);
        })?;

        let dir = script.parent().unwrap_or_else(|| Path::new("."));
        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(Self { watcher, script })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn unwatch(&mut self) -> notify::Result<()> {
        let dir = self.script.parent().unwrap_or_else(|| Path::new("."));
        self.watcher.unwatch(dir)
    }
}

/// True for writes, creations and renames that involve `script`
pub fn touches_script(event: &Event, script: &Path) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
        && event.paths.iter().any(|p| same_file(p, script))
}

fn same_file(a: &Path, b: &Path) -> bool {
    a == b || (a.file_name() == b.file_name() && absolute(a) == absolute(b))
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn test_event_filter() {
        let script = Path::new("/tmp/knob-tests/live.cs");
        let write = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(script.to_path_buf());
        assert!(touches_script(&write, script));

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path(script.to_path_buf());
        assert!(touches_script(&create, script));

        let other = Event::new(EventKind::Modify(ModifyKind::Any))
            .add_path(PathBuf::from("/tmp/knob-tests/other.cs"));
        assert!(!touches_script(&other, script));

        let removed = Event::new(EventKind::Remove(RemoveKind::File)).add_path(script.to_path_buf());
        assert!(!touches_script(&removed, script));
    }
}
