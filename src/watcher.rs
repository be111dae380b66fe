//! Working-tree change watcher.
//!
//! The filesystem callback runs on the notifier's own thread and never
//! touches session state. It only pushes a unit signal into a channel. A
//! single tokio task owns the debounce deadline: every signal re-arms it, and
//! when it expires without a new signal the trigger runs once and the task
//! goes back to waiting.
//!
//! Events under the control directory (`.git`) are ignored, so the refresh a
//! trigger causes cannot feed back into the watcher.

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use notify::event::{MetadataKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub const CONTROL_DIR: &str = ".git";

pub struct ChangeWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
    debouncer: JoinHandle<()>,
}

impl ChangeWatcher {
    /// Watch `root` recursively and call `on_trigger` after each burst of
    /// changes has been quiet for `delay`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<F>(root: &Path, delay: Duration, on_trigger: F) -> notify::Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter_root = root.to_path_buf();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_relevant(&filter_root, &event) => {
                let _ = tx.send(());
            }
            Ok(_) => {}
            Err(e) => tracing::debug!("Watch error: {}", e),
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        tracing::info!("Watching {}", root.display());

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
            debouncer: spawn_debouncer(delay, rx, on_trigger),
        })
    }

    /// Stop watching. A pending debounce is dropped; a refresh the trigger
    /// already dispatched keeps running.
    pub fn stop(self) {}
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        self.debouncer.abort();
        tracing::info!("Stopped watching {}", self.root.display());
    }
}

/// Coalesce signals from `rx` into single `on_trigger` calls.
///
/// The task ends when every sender is gone.
pub fn spawn_debouncer<F>(delay: Duration, mut rx: mpsc::UnboundedReceiver<()>, on_trigger: F) -> JoinHandle<()>
where
    F: Fn() + Send + 'static,
{
    tokio::spawn(async move {
        let mut deadline: Option<Instant> = None;
        loop {
            match deadline {
                None => match rx.recv().await {
                    Some(()) => deadline = Some(Instant::now() + delay),
                    None => break,
                },
                Some(at) => tokio::select! {
                    signal = rx.recv() => match signal {
                        Some(()) => deadline = Some(Instant::now() + delay),
                        None => break,
                    },
                    _ = tokio::time::sleep_until(at) => {
                        deadline = None;
                        tracing::debug!("Change burst settled, refreshing");
                        on_trigger();
                    }
                },
            }
        }
    })
}

/// Whether `event` should schedule a refresh.
///
/// Events that carry no paths, or that report dropped events, cannot be
/// attributed to the control directory and always count.
pub fn is_relevant(root: &Path, event: &Event) -> bool {
    if event.need_rescan() {
        return true;
    }
    let kind_matches = match event.kind {
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::AccessTime)) => false,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) | EventKind::Any => true,
        EventKind::Access(_) | EventKind::Other => false,
    };
    kind_matches && (event.paths.is_empty() || event.paths.iter().any(|path| !in_control_dir(root, path)))
}

/// Whether `path` lies inside the control directory of the repository at
/// `root`.
pub fn in_control_dir(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .any(|c| matches!(c, Component::Normal(name) if name == CONTROL_DIR))
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, Flag, RemoveKind, RenameMode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn event(kind: EventKind, path: PathBuf) -> Event {
        Event::new(kind).add_path(path)
    }

    #[test]
    fn control_directory_is_excluded() {
        let root = Path::new("/repo");
        assert!(in_control_dir(root, Path::new("/repo/.git/index")));
        assert!(in_control_dir(root, Path::new("/repo/sub/.git/HEAD")));
        assert!(!in_control_dir(root, Path::new("/repo/.gitignore")));
        assert!(!in_control_dir(root, Path::new("/repo/src/main.rs")));
    }

    #[test]
    fn events_without_paths_are_relevant() {
        let root = Path::new("/repo");
        assert!(is_relevant(root, &Event::new(EventKind::Any)));
        assert!(is_relevant(root, &Event::new(EventKind::Modify(ModifyKind::Any))));
        assert!(is_relevant(root, &Event::new(EventKind::Other).set_flag(Flag::Rescan)));
        assert!(!is_relevant(root, &Event::new(EventKind::Access(AccessKind::Any))));
    }

    #[test]
    fn working_tree_mutations_are_relevant() {
        let root = Path::new("/repo");
        let file = root.join("a.txt");
        assert!(is_relevant(root, &event(EventKind::Create(CreateKind::File), file.clone())));
        assert!(is_relevant(root, &event(EventKind::Remove(RemoveKind::File), file.clone())));
        assert!(is_relevant(
            root,
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), file.clone())
        ));
        assert!(!is_relevant(root, &event(EventKind::Access(AccessKind::Any), file)));
        assert!(!is_relevant(
            root,
            &event(EventKind::Create(CreateKind::File), root.join(".git/index.lock"))
        ));
    }

    fn counter() -> (Arc<AtomicUsize>, impl Fn() + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        (count, move || {
            hits.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn burst_fires_once() {
        let (count, on_trigger) = counter();
        let (tx, rx) = mpsc::unbounded_channel();
        let _task = spawn_debouncer(Duration::from_millis(500), rx, on_trigger);

        for _ in 0..20 {
            tx.send(()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_bursts_fire_separately() {
        let (count, on_trigger) = counter();
        let (tx, rx) = mpsc::unbounded_channel();
        let _task = spawn_debouncer(Duration::from_millis(500), rx, on_trigger);

        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(()).unwrap();
        tx.send(()).unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn closing_the_channel_drops_a_pending_trigger() {
        let (count, on_trigger) = counter();
        let (tx, rx) = mpsc::unbounded_channel();
        let task = spawn_debouncer(Duration::from_millis(500), rx, on_trigger);

        tx.send(()).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
