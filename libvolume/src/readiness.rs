//! Mount point readiness checks.
//!
//! Once the backend knows about a volume, its kernel client surfaces the
//! volume as a directory under the namespace mount. That happens
//! asynchronously, so after a create the driver waits for the mount point to
//! show up before reporting success.
//!
//! Two policies are supported:
//!
//! * [`ReadinessPolicy::Poll`] (default): check up to `max_attempts` times
//!   with a doubling sleep between checks, giving up once `deadline` has
//!   elapsed.
//! * [`ReadinessPolicy::TriggerThenVerify`]: `mkdir` the mount point to make
//!   the client refresh its volume list, sleep `trigger_delay`, then check
//!   once. Kept for backends with fast propagation.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::fs::DirBuilder;
use tracing::{debug, info, instrument};

use crate::error::VolumeError;

/// How the checker waits for a mount point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReadinessPolicy {
    /// Bounded polling with exponential backoff.
    #[default]
    Poll,
    /// Create the directory, wait once, verify once.
    TriggerThenVerify,
}

/// Retry budget for readiness checks.
#[derive(Debug, Clone)]
pub struct ReadinessConfig {
    pub policy: ReadinessPolicy,
    /// Maximum number of existence checks in poll mode.
    pub max_attempts: u32,
    /// Wall-clock budget in poll mode.
    pub deadline: Duration,
    /// First sleep between poll attempts; doubled after every attempt.
    pub initial_backoff: Duration,
    /// Fixed propagation delay in trigger mode.
    pub trigger_delay: Duration,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            policy: ReadinessPolicy::Poll,
            max_attempts: 5,
            deadline: Duration::from_secs(30),
            initial_backoff: Duration::from_secs(1),
            trigger_delay: Duration::from_secs(1),
        }
    }
}

/// Waits for mount points to become usable directories.
#[derive(Debug)]
pub struct ReadinessChecker {
    config: ReadinessConfig,
    checks: AtomicU64,
}

impl ReadinessChecker {
    pub fn new(config: ReadinessConfig) -> Self {
        Self {
            config,
            checks: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ReadinessConfig {
        &self.config
    }

    /// Number of [`Self::wait_ready`] calls made so far.
    pub fn checks_performed(&self) -> u64 {
        self.checks.load(Ordering::Relaxed)
    }

    /// Wait until `path` exists and is a directory, according to the
    /// configured policy.
    #[instrument(skip_all, fields(path = %path.display(), policy = ?self.config.policy))]
    pub async fn wait_ready(&self, path: &Path) -> Result<(), VolumeError> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        match self.config.policy {
            ReadinessPolicy::Poll => self.poll(path).await,
            ReadinessPolicy::TriggerThenVerify => self.trigger_then_verify(path).await,
        }
    }

    async fn poll(&self, path: &Path) -> Result<(), VolumeError> {
        let start = Instant::now();
        let max_attempts = self.config.max_attempts.max(1);
        let mut backoff = self.config.initial_backoff;
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            match check_dir(path).await {
                Ok(()) => {
                    info!(
                        attempt,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "mount point ready"
                    );
                    return Ok(());
                }
                Err(e) => {
                    debug!(attempt, error = %e, "mount point not ready yet");
                    last_error = Some(e);
                }
            }

            let elapsed = start.elapsed();
            if attempt == max_attempts || elapsed >= self.config.deadline {
                break;
            }
            tokio::time::sleep(backoff.min(self.config.deadline - elapsed)).await;
            backoff = backoff.saturating_mul(2);
        }

        Err(VolumeError::Timeout {
            path: path.to_path_buf(),
            source: last_error.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not appear", path.display()),
                )
            }),
        })
    }

    async fn trigger_then_verify(&self, path: &Path) -> Result<(), VolumeError> {
        let mut builder = DirBuilder::new();
        builder.mode(0o755);
        match builder.create(path).await {
            Ok(()) => debug!("mount point created locally"),
            // Expected: the client already lists the volume.
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("mount point already surfaced");
            }
            Err(e) => return Err(VolumeError::io(path, e)),
        }

        tokio::time::sleep(self.config.trigger_delay).await;

        check_dir(path)
            .await
            .map_err(|source| VolumeError::Timeout {
                path: path.to_path_buf(),
                source,
            })?;
        info!("mount point ready");
        Ok(())
    }
}

/// `Ok` iff `path` exists and is a directory (symlinks are followed).
async fn check_dir(path: &Path) -> io::Result<()> {
    let meta = tokio::fs::metadata(path).await?;
    if meta.is_dir() {
        Ok(())
    } else {
        Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", path.display()),
        ))
    }
}
