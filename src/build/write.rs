//! Concurrent output writer.
//!
//! Writes run as tokio tasks. A semaphore bounds how many are in flight and
//! a per-path lock serializes writes that target the same file. Files whose
//! bytes already match are left untouched so unchanged rebuilds do not bump
//! modification times.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::error::RoqError;

/// Bytes for one output file.
#[derive(Debug, Clone)]
pub enum WriteContents {
    Bytes(Vec<u8>),
    /// Byte-for-byte copy of a source file
    Copy(PathBuf),
}

#[derive(Debug, Clone)]
pub struct WriteJob {
    pub target: PathBuf,
    /// Contributor, for error messages
    pub origin: String,
    pub contents: WriteContents,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written: usize,
    pub unchanged: usize,
}

/// Lock per output path, created on first use.
#[derive(Default)]
struct PathLocks {
    locks: parking_lot::Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>,
}

impl PathLocks {
    fn lock_for(&self, path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .clone()
    }
}

/// Write every job with at most `io_concurrency` writes in flight.
///
/// All jobs run even when some fail; files already written stay in place.
pub async fn write_all(
    jobs: Vec<WriteJob>,
    io_concurrency: usize,
) -> Result<WriteOutcome, RoqError> {
    let semaphore = Arc::new(Semaphore::new(io_concurrency.max(1)));
    let locks = Arc::new(PathLocks::default());
    let mut tasks = JoinSet::new();

    for job in jobs {
        let semaphore = semaphore.clone();
        let locks = locks.clone();
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| write_error(&job, std::io::Error::other(e)))?;
            let lock = locks.lock_for(&job.target);
            let _guard = lock.lock().await;
            write_one(&job).await.map_err(|e| write_error(&job, e))
        });
    }

    let mut outcome = WriteOutcome::default();
    let mut errors = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(true)) => outcome.written += 1,
            Ok(Ok(false)) => outcome.unchanged += 1,
            Ok(Err(err)) => {
                tracing::error!("{err}");
                errors.push(err);
            }
            Err(join_error) => errors.push(RoqError::Write {
                origin: "writer".to_string(),
                target: PathBuf::new(),
                error: std::io::Error::other(join_error),
            }),
        }
    }

    tracing::debug!(
        "wrote {} file(s), {} unchanged",
        outcome.written,
        outcome.unchanged
    );

    match errors.len() {
        0 => Ok(outcome),
        1 => Err(errors.remove(0)),
        _ => Err(RoqError::Aggregate(errors)),
    }
}

fn write_error(job: &WriteJob, error: std::io::Error) -> RoqError {
    RoqError::Write {
        origin: job.origin.clone(),
        target: job.target.clone(),
        error,
    }
}

/// Returns false when the target already held these bytes.
async fn write_one(job: &WriteJob) -> std::io::Result<bool> {
    let bytes = match &job.contents {
        WriteContents::Bytes(bytes) => bytes.clone(),
        WriteContents::Copy(source) => tokio::fs::read(source).await?,
    };

    if let Ok(existing) = tokio::fs::read(&job.target).await
        && existing == bytes
    {
        return Ok(false);
    }

    if let Some(parent) = job.target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&job.target, bytes).await?;
    Ok(true)
}
