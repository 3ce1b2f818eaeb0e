use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::{TimewarpError, TimewarpResult};

/// Upper bound on the default worker count on host CPUs.
pub const MAX_HOST_WORKERS: usize = 4;

pub const DEFAULT_SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Worker pool settings.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimewarpConfig {
    /// Worker thread count; `None` picks hardware threads capped at [`MAX_HOST_WORKERS`].
    pub workers: Option<usize>,
    /// Restrict workers to the highest-frequency CPU cluster.
    pub pin_big_cores: bool,
    /// Request `SCHED_FIFO` for worker threads. Usually needs elevated privileges.
    pub realtime_priority: bool,
    /// Where per-CPU `cpufreq` directories are read from.
    pub sysfs_cpu_root: PathBuf,
}

impl Default for TimewarpConfig {
    fn default() -> Self {
        Self {
            workers: None,
            pin_big_cores: true,
            realtime_priority: false,
            sysfs_cpu_root: PathBuf::from(DEFAULT_SYSFS_CPU_ROOT),
        }
    }
}

impl TimewarpConfig {
    pub fn validate(&self) -> TimewarpResult<()> {
        if let Some(n) = self.workers
            && n == 0
        {
            return Err(TimewarpError::validation("timewarp 'workers' must be >= 1 when set"));
        }
        Ok(())
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_HOST_WORKERS)
        })
    }

    pub fn from_json_str(s: &str) -> TimewarpResult<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse timewarp config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: &Path) -> TimewarpResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read timewarp config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }
}
