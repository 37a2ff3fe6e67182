//! Real-time scheduling for the step loop (Linux SCHED_FIFO / affinity /
//! mlockall; macOS mlockall only).
//!
//! Every step is a busy-waited pulse of a few hundred microseconds, so the
//! process should neither page fault nor migrate between CPUs mid-move.
//! Failures are warnings: the machine still runs, only with more jitter.

use std::sync::OnceLock;

use tracing::{info, warn};

use crate::cli::{RtLock, RtOpts};

static RT_ONCE: OnceLock<()> = OnceLock::new();

/// Apply the requested real-time settings once per process.
pub fn setup_rt_once(opts: &RtOpts) {
    if !opts.rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        let lock = opts.rt_lock.unwrap_or(RtLock::os_default());
        match lock_memory(lock) {
            Ok(()) => info!(?lock, "rt: memory lock applied"),
            Err(e) => warn!(error = %e, "rt: mlockall failed"),
        }
        #[cfg(target_os = "linux")]
        {
            if let Err(e) = linux::fifo_priority(opts.rt_prio) {
                warn!(error = %e, prio = ?opts.rt_prio, "rt: SCHED_FIFO not applied");
            }
            if let Err(e) = linux::pin_cpu(opts.rt_cpu.unwrap_or(0)) {
                warn!(error = %e, "rt: affinity not applied");
            }
        }
        #[cfg(not(target_os = "linux"))]
        {
            let _ = (opts.rt_prio, opts.rt_cpu);
            warn!("rt: SCHED_FIFO and affinity are Linux only; only mlockall applied");
        }
    });
}

#[cfg(unix)]
fn lock_memory(lock: RtLock) -> eyre::Result<()> {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};

    let flags = match lock {
        RtLock::None => return Ok(()),
        RtLock::Current => MCL_CURRENT,
        RtLock::All => MCL_CURRENT | MCL_FUTURE,
    };
    // SAFETY: mlockall only takes flags and touches no Rust-managed memory.
    if unsafe { mlockall(flags) } == 0 {
        return Ok(());
    }
    let err = std::io::Error::last_os_error();
    let retryable = matches!(err.raw_os_error(), Some(c) if c == libc::EPERM || c == libc::ENOMEM);
    if lock == RtLock::All && retryable {
        // SAFETY: as above.
        if unsafe { mlockall(MCL_CURRENT) } == 0 {
            warn!(error = %err, "rt: mlockall(current|future) failed, locked current pages only");
            return Ok(());
        }
    }
    if retryable {
        eyre::bail!("{err}; hint: needs CAP_IPC_LOCK (or root) and a sufficient 'ulimit -l'");
    }
    Err(eyre::Report::new(err))
}

#[cfg(not(unix))]
fn lock_memory(_lock: RtLock) -> eyre::Result<()> {
    eyre::bail!("memory locking is not supported on this OS")
}

#[cfg(target_os = "linux")]
mod linux {
    /// Capacity of cpu_set_t in CPU indices (bits).
    const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

    /// SCHED_FIFO at `prio`, clamped to the system range (max when unset).
    pub fn fifo_priority(prio: Option<i32>) -> eyre::Result<()> {
        use libc::{SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param};

        // SAFETY: plain syscalls on the calling process.
        let (min, max) = unsafe {
            (
                sched_get_priority_min(SCHED_FIFO),
                sched_get_priority_max(SCHED_FIFO),
            )
        };
        let (min, max) = if min < 0 || max < 0 { (1, 99) } else { (min, max) };
        let param = sched_param {
            sched_priority: prio.unwrap_or(max).clamp(min, max),
        };
        // SAFETY: `param` outlives the call.
        if unsafe { libc::sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EPERM) {
                eyre::bail!(
                    "{err}; hint: needs CAP_SYS_NICE or root ('sudo setcap cap_sys_nice=ep /path/to/stainer')"
                );
            }
            return Err(eyre::Report::new(err));
        }
        Ok(())
    }

    /// Pin the process to `cpu` if the current affinity mask allows it.
    pub fn pin_cpu(cpu: usize) -> eyre::Result<()> {
        use libc::{CPU_ISSET, CPU_SET, CPU_ZERO, cpu_set_t};

        if cpu >= MAX_CPUSET_BITS {
            eyre::bail!("requested CPU {cpu} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
        }
        // SAFETY: sysconf has no memory side effects.
        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if online < 1 || cpu as libc::c_long >= online {
            eyre::bail!("requested CPU {cpu} >= online {online}");
        }
        // SAFETY: cpu_set_t is plain data; zeroed is a valid empty set and
        // the size passed matches the buffer.
        unsafe {
            let mut allowed: cpu_set_t = std::mem::zeroed();
            CPU_ZERO(&mut allowed);
            if libc::sched_getaffinity(0, std::mem::size_of::<cpu_set_t>(), &mut allowed) != 0 {
                return Err(eyre::Report::new(std::io::Error::last_os_error()));
            }
            if !CPU_ISSET(cpu, &allowed) {
                eyre::bail!("CPU {cpu} not permitted by current affinity mask");
            }
            let mut desired: cpu_set_t = std::mem::zeroed();
            CPU_ZERO(&mut desired);
            CPU_SET(cpu, &mut desired);
            if libc::sched_setaffinity(0, std::mem::size_of::<cpu_set_t>(), &desired) != 0 {
                return Err(eyre::Report::new(std::io::Error::last_os_error()));
            }
        }
        Ok(())
    }
}
