//! Repository sessions.
//!
//! A `RepoSession` owns one open repository: the backend handle, the current
//! snapshot, the change watcher and the operation lock. `Workspace` holds the
//! single active session and replaces it when another repository is opened.
//!
//! Locking:
//! - `op_lock` admits one operation at a time; a second caller gets `Busy`
//!   instead of waiting
//! - `backend` guards the git handle; every rebuild and every publish of the
//!   snapshot happens while it is held, so snapshots are published in the
//!   order they were built and the last build wins
//!
//! All git work runs on the blocking pool. Only results come back to the
//! async side.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Instant;

use tokio::sync::{watch, RwLock};

use crate::config::SessionConfig;
use crate::error::{AppError, Result};
use crate::git::cli::{Bound, GitCli};
use crate::git::operations;
use crate::git::render;
use crate::git::status::build_snapshot;
use crate::git::GitRepository;
use crate::models::{DiffLine, Operation, OperationOutcome, RepositoryInfo, StatusSnapshot};
use crate::watcher::ChangeWatcher;

type SharedBackend = Arc<Mutex<GitRepository>>;

fn lock_backend(backend: &SharedBackend) -> Result<MutexGuard<'_, GitRepository>> {
    backend
        .lock()
        .map_err(|_| AppError::Internal("Lock poisoned".to_string()))
}

async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Worker task failed: {}", e)))?
}

/// Replaces the published snapshot, unless the session has been closed.
#[derive(Clone)]
struct Publisher {
    tx: Arc<watch::Sender<Arc<StatusSnapshot>>>,
    closed: Arc<AtomicBool>,
}

impl Publisher {
    fn publish(&self, snapshot: StatusSnapshot) -> Arc<StatusSnapshot> {
        let snapshot = Arc::new(snapshot);
        if self.closed.load(Ordering::SeqCst) {
            tracing::debug!("Session closed, dropping snapshot");
        } else {
            self.tx.send_replace(snapshot.clone());
        }
        snapshot
    }
}

pub struct RepoSession {
    root: PathBuf,
    config: SessionConfig,
    cli: GitCli,
    backend: SharedBackend,
    publisher: Publisher,
    op_lock: Arc<tokio::sync::Mutex<()>>,
    watcher: Mutex<Option<ChangeWatcher>>,
}

impl RepoSession {
    /// Open the repository containing `path`.
    pub async fn open(path: impl AsRef<Path>, config: SessionConfig) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let backend = run_blocking(move || GitRepository::open(&path)).await?;
        Self::start(backend, config).await
    }

    /// Build the first snapshot and start watching the working tree.
    pub async fn start(backend: GitRepository, config: SessionConfig) -> Result<Arc<Self>> {
        let root = backend.root.clone();
        let cli = GitCli::new(&root, &config);
        let (tx, _) = watch::channel(Arc::new(StatusSnapshot::unavailable("Loading")));

        let session = Arc::new(Self {
            root,
            config,
            cli,
            backend: Arc::new(Mutex::new(backend)),
            publisher: Publisher {
                tx: Arc::new(tx),
                closed: Arc::new(AtomicBool::new(false)),
            },
            op_lock: Arc::new(tokio::sync::Mutex::new(())),
            watcher: Mutex::new(None),
        });

        session.refresh().await?;
        session.start_watcher();

        tracing::info!("Opened session for {}", session.root.display());
        Ok(session)
    }

    fn start_watcher(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let started = ChangeWatcher::start(&self.root, self.config.debounce, move || {
            let Some(session) = weak.upgrade() else {
                return;
            };
            tokio::spawn(async move {
                if let Err(e) = session.refresh().await {
                    tracing::warn!("Background refresh failed: {}", e);
                }
            });
        });

        match started {
            Ok(watcher) => {
                if let Ok(mut slot) = self.watcher.lock() {
                    *slot = Some(watcher);
                }
            }
            Err(e) => tracing::warn!(
                "Could not watch {}, refresh manually: {}",
                self.root.display(),
                e
            ),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    pub fn is_closed(&self) -> bool {
        self.publisher.closed.load(Ordering::SeqCst)
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Arc<StatusSnapshot> {
        self.publisher.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<StatusSnapshot>> {
        self.publisher.tx.subscribe()
    }

    pub async fn info(&self) -> Result<RepositoryInfo> {
        let backend = self.backend.clone();
        run_blocking(move || Ok(lock_backend(&backend)?.info())).await
    }

    /// Rebuild and publish the snapshot.
    pub async fn refresh(&self) -> Result<Arc<StatusSnapshot>> {
        let backend = self.backend.clone();
        let cli = self.cli.clone();
        let publisher = self.publisher.clone();
        let limit = self.config.history_limit;

        run_blocking(move || {
            let guard = lock_backend(&backend)?;
            Ok(publisher.publish(build_snapshot(&guard, &cli, limit)))
        })
        .await
    }

    /// Run one operation and return the snapshot rebuilt after it.
    ///
    /// Rejected with `Busy` while another operation is in flight. Validation
    /// and precheck failures leave the repository and the snapshot
    /// untouched. Once the backend has been reached the snapshot is rebuilt
    /// whether the operation succeeded or not.
    pub async fn execute(&self, op: Operation) -> Result<OperationOutcome> {
        let permit = self
            .op_lock
            .clone()
            .try_lock_owned()
            .map_err(|_| AppError::Busy)?;

        operations::validate(&op)?;

        let name = op.name();
        let started = Instant::now();
        tracing::info!("Running {}", name);

        let backend = self.backend.clone();
        let cli = self.cli.clone();
        let publisher = self.publisher.clone();
        let limit = self.config.history_limit;

        let result = run_blocking(move || {
            let _permit = permit;
            let guard = lock_backend(&backend)?;
            operations::precheck(&guard, &op)?;

            let applied = operations::apply(&guard, &cli, &op);
            let snapshot = publisher.publish(build_snapshot(&guard, &cli, limit));

            Ok(OperationOutcome {
                operation: name.to_string(),
                message: applied?,
                snapshot,
            })
        })
        .await;

        match &result {
            Ok(outcome) => tracing::info!("{} finished in {:?}: {}", name, started.elapsed(), outcome.message),
            Err(e) => tracing::warn!("{} failed after {:?}: {}", name, started.elapsed(), e),
        }
        result
    }

    pub async fn diff_file(&self, path: &str) -> Result<Vec<DiffLine>> {
        let cli = self.cli.clone();
        let path = path.to_string();
        run_blocking(move || render::diff_file(&cli, &path)).await
    }

    pub async fn show_commit(&self, id: &str) -> Result<Vec<DiffLine>> {
        let cli = self.cli.clone();
        let id = id.to_string();
        run_blocking(move || render::show_commit(&cli, &id)).await
    }

    pub async fn blame(&self, path: &str) -> Result<Vec<DiffLine>> {
        let cli = self.cli.clone();
        let path = path.to_string();
        run_blocking(move || render::blame(&cli, &path)).await
    }

    /// Stop watching and stop publishing. Work already dispatched runs to
    /// completion but its snapshot is dropped.
    pub fn close(&self) {
        if self.publisher.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Ok(mut slot) = self.watcher.lock() {
            if let Some(watcher) = slot.take() {
                watcher.stop();
            }
        }
        tracing::info!("Closed session for {}", self.root.display());
    }
}

pub type SharedWorkspace = Arc<Workspace>;

impl std::fmt::Debug for RepoSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoSession")
            .field("root", &self.root)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Holder of the one active session.
pub struct Workspace {
    config: SessionConfig,
    current: RwLock<Option<Arc<RepoSession>>>,
}

impl Workspace {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Result<Arc<RepoSession>> {
        self.current.read().await.clone().ok_or(AppError::NoSession)
    }

    /// Open the repository containing `path` and make it the active session.
    ///
    /// A path with no repository fails before the current session is touched.
    pub async fn open(&self, path: impl AsRef<Path>) -> Result<Arc<RepoSession>> {
        let path = path.as_ref().to_path_buf();
        let backend = run_blocking(move || GitRepository::open(&path)).await?;
        self.switch_to(backend).await
    }

    /// Create an empty repository at `path` and open it.
    pub async fn init(&self, path: impl AsRef<Path>) -> Result<Arc<RepoSession>> {
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(AppError::Validation("Path is required".to_string()));
        }
        let backend = run_blocking(move || GitRepository::init(&path).map_err(|e| e.at_operation("init"))).await?;
        self.switch_to(backend).await
    }

    /// Clone `url` into `path` with the command-line tool and open the result.
    pub async fn clone_repo(&self, url: &str, path: impl AsRef<Path>) -> Result<Arc<RepoSession>> {
        let url = url.trim().to_string();
        let target = path.as_ref().to_path_buf();
        if url.is_empty() {
            return Err(AppError::Validation("Clone URL is required".to_string()));
        }
        if target.as_os_str().is_empty() {
            return Err(AppError::Validation("Clone destination is required".to_string()));
        }

        let config = self.config.clone();
        let backend = run_blocking(move || {
            let target = absolute(&target)?;
            let parent = target
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| AppError::InvalidPath(target.display().to_string()))?;
            std::fs::create_dir_all(&parent)
                .map_err(|e| AppError::InvalidPath(format!("{}: {}", parent.display(), e)))?;

            let destination = target.to_string_lossy().to_string();
            tracing::info!("Cloning {} into {}", url, destination);
            GitCli::new(&parent, &config).run("clone", &["clone", "--", &url, &destination], Bound::Network)?;

            GitRepository::open(&target)
        })
        .await?;

        self.switch_to(backend).await
    }

    async fn switch_to(&self, backend: GitRepository) -> Result<Arc<RepoSession>> {
        let mut slot = self.current.write().await;
        if let Some(previous) = slot.take() {
            previous.close();
        }
        let session = RepoSession::start(backend, self.config.clone()).await?;
        *slot = Some(session.clone());
        Ok(session)
    }

    /// Close the active session, if any.
    pub async fn close(&self) {
        if let Some(session) = self.current.write().await.take() {
            session.close();
        }
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(cwd.join(path))
}
