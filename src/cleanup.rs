use log::{debug, warn};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracks staging paths that must not outlive an interrupted install
#[derive(Debug, Default)]
pub struct CleanupContext {
    paths: Vec<PathBuf>,
}

impl CleanupContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a path to be removed on interruption
    pub fn add(&mut self, path: PathBuf) {
        if !self.paths.contains(&path) {
            self.paths.push(path);
        }
    }

    pub fn remove(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Remove every registered path from disk, ignoring failures
    pub fn cleanup(&self) {
        for path in &self.paths {
            debug!("Cleaning up: {:?}", path);
            let result = if path.is_dir() {
                std::fs::remove_dir_all(path)
            } else if path.exists() {
                std::fs::remove_file(path)
            } else {
                Ok(())
            };
            if let Err(e) = result {
                warn!("Failed to clean up {:?}: {}", path, e);
            }
        }
    }
}

pub type SharedCleanupContext = Arc<Mutex<CleanupContext>>;

pub fn new_shared() -> SharedCleanupContext {
    Arc::new(Mutex::new(CleanupContext::new()))
}

/// Lock the context even if a previous holder panicked.
pub fn lock(ctx: &SharedCleanupContext) -> MutexGuard<'_, CleanupContext> {
    ctx.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns a staging path for the duration of an install.
///
/// The path is registered on creation so an interrupt handler can remove it.
/// Dropping the guard deletes the path and unregisters it, on success and on
/// error alike.
pub struct CleanupGuard {
    ctx: SharedCleanupContext,
    path: PathBuf,
}

impl CleanupGuard {
    pub fn new(ctx: SharedCleanupContext, path: PathBuf) -> Self {
        lock(&ctx).add(path.clone());
        Self { ctx, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let mut ctx = lock(&self.ctx);
        if self.path.exists() {
            debug!("Removing staging directory {:?}", self.path);
            if let Err(e) = std::fs::remove_dir_all(&self.path) {
                warn!("Failed to remove {:?}: {}", self.path, e);
            }
        }
        ctx.remove(&self.path);
    }
}

/// Ctrl-C handler that cleans up `ctx` and exits with status 130.
///
/// Tokio keeps SIGINT for the rest of the process once `ctrl_c` is awaited,
/// so hold the handler until the command returns. Dropping it stops the task.
pub struct InterruptHandler {
    task: tokio::task::JoinHandle<()>,
}

impl InterruptHandler {
    pub fn spawn(ctx: SharedCleanupContext) -> Self {
        let task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupted, cleaning up...");
                lock(&ctx).cleanup();
                std::process::exit(130);
            }
        });
        Self { task }
    }

    #[cfg(test)]
    fn abort_handle(&self) -> tokio::task::AbortHandle {
        self.task.abort_handle()
    }
}

impl Drop for InterruptHandler {
    fn drop(&mut self) {
        self.task.abort();
    }
}
