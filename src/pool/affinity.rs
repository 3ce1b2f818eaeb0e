//! Worker thread placement: big-core discovery, CPU pinning, real-time priority.

use std::path::Path;

use crate::foundation::error::{TimewarpError, TimewarpResult};

/// CPUs in the highest-frequency cluster, ascending.
///
/// Reads `<root>/cpuN/cpufreq/cpuinfo_max_freq` for every `cpuN` entry; CPUs without a
/// readable frequency are skipped. On a homogeneous system every CPU is returned, and when no
/// frequency is readable at all the list is empty.
pub fn big_cores(sysfs_cpu_root: &Path) -> Vec<usize> {
    let Ok(entries) = std::fs::read_dir(sysfs_cpu_root) else {
        tracing::debug!(root = %sysfs_cpu_root.display(), "cpu sysfs root unreadable");
        return Vec::new();
    };

    let mut freqs: Vec<(usize, u64)> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name();
            let cpu: usize = name.to_str()?.strip_prefix("cpu")?.parse().ok()?;
            let path = entry.path().join("cpufreq").join("cpuinfo_max_freq");
            let freq = std::fs::read_to_string(path).ok()?.trim().parse().ok()?;
            Some((cpu, freq))
        })
        .collect();

    let Some(max) = freqs.iter().map(|(_, f)| *f).max() else {
        return Vec::new();
    };
    freqs.retain(|(_, f)| *f == max);
    let mut cpus: Vec<usize> = freqs.into_iter().map(|(cpu, _)| cpu).collect();
    cpus.sort_unstable();
    cpus
}

/// Restrict the calling thread to `cpus`.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(cpus: &[usize]) -> TimewarpResult<()> {
    use nix::sched::{CpuSet, sched_setaffinity};
    use nix::unistd::Pid;

    if cpus.is_empty() {
        return Err(TimewarpError::misuse("cpu set is empty"));
    }
    let mut set = CpuSet::new();
    for &cpu in cpus {
        set.set(cpu)
            .map_err(|e| TimewarpError::validation(format!("cpu {cpu}: {e}")))?;
    }
    sched_setaffinity(Pid::from_raw(0), &set)
        .map_err(|e| TimewarpError::Other(anyhow::anyhow!("sched_setaffinity: {e}")))
}

#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_cpus: &[usize]) -> TimewarpResult<()> {
    Err(TimewarpError::Other(anyhow::anyhow!("thread affinity is not supported on this platform")))
}

/// Move the calling thread into `SCHED_FIFO` at the lowest real-time priority.
#[cfg(target_os = "linux")]
#[allow(unsafe_code)]
pub fn raise_realtime_priority() -> TimewarpResult<()> {
    // SAFETY: `param` is a valid, initialised `sched_param` that outlives the call; pid 0 names
    // the calling thread.
    let rc = unsafe {
        let param = libc::sched_param {
            sched_priority: libc::sched_get_priority_min(libc::SCHED_FIFO),
        };
        libc::sched_setscheduler(0, libc::SCHED_FIFO, &param)
    };
    if rc == 0 {
        Ok(())
    } else {
        Err(TimewarpError::Other(anyhow::anyhow!(
            "sched_setscheduler: {}",
            std::io::Error::last_os_error()
        )))
    }
}

#[cfg(not(target_os = "linux"))]
pub fn raise_realtime_priority() -> TimewarpResult<()> {
    Err(TimewarpError::Other(anyhow::anyhow!(
        "real-time scheduling is not supported on this platform"
    )))
}

/// Per-worker start hook. Failures are logged and otherwise ignored.
pub(crate) fn prepare_worker(index: usize, cpus: &[usize], realtime: bool) {
    if !cpus.is_empty() {
        match pin_current_thread(cpus) {
            Ok(()) => tracing::debug!(worker = index, ?cpus, "pinned worker"),
            Err(e) => tracing::warn!(worker = index, error = %e, "failed to pin worker"),
        }
    }
    if realtime {
        match raise_realtime_priority() {
            Ok(()) => tracing::debug!(worker = index, "worker running SCHED_FIFO"),
            Err(e) => tracing::warn!(worker = index, error = %e, "failed to raise worker priority"),
        }
    }
}
