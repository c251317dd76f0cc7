//! Real-time scheduling helpers (Linux SCHED_FIFO / affinity / mlockall;
//! macOS mlockall).

#[cfg(any(target_os = "linux", target_os = "macos"))]
use crate::cli::RtLock;

#[cfg(target_os = "linux")]
pub fn setup_rt_once(rt: bool, prio: Option<i32>, lock: RtLock, rt_cpu: Option<usize>) {
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }

    fn apply_mem_lock(lock: RtLock) -> std::io::Result<()> {
        use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
        let flags = match lock {
            RtLock::None => return Ok(()),
            RtLock::Current => MCL_CURRENT,
            RtLock::All => MCL_CURRENT | MCL_FUTURE,
        };
        if unsafe { mlockall(flags) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    // SCHED_FIFO with the priority clamped to the platform range.
    fn apply_fifo_priority(prio: Option<i32>) -> std::io::Result<()> {
        use libc::{
            SCHED_FIFO, sched_get_priority_max, sched_get_priority_min, sched_param,
            sched_setscheduler,
        };
        let (min, max) = unsafe {
            let min = sched_get_priority_min(SCHED_FIFO);
            let max = sched_get_priority_max(SCHED_FIFO);
            if min < 0 || max < 0 { (1, 99) } else { (min, max) }
        };
        let param = sched_param {
            sched_priority: prio.unwrap_or(max).clamp(min, max),
        };
        if unsafe { sched_setscheduler(0, SCHED_FIFO, &param) } != 0 {
            return Err(std::io::Error::last_os_error());
        }
        Ok(())
    }

    // Pin to a single CPU if permitted by the current affinity mask.
    fn apply_affinity(rt_cpu: Option<usize>) -> eyre::Result<()> {
        use libc::{CPU_ISSET, CPU_SET, CPU_ZERO};
        const MAX_CPUSET_BITS: usize = std::mem::size_of::<libc::cpu_set_t>() * 8;

        let online = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
        if online < 1 {
            eyre::bail!("_SC_NPROCESSORS_ONLN < 1");
        }
        let target = rt_cpu.unwrap_or(0);
        if target as libc::c_long >= online {
            eyre::bail!("requested CPU {target} >= online {online}");
        }
        if target >= MAX_CPUSET_BITS {
            eyre::bail!("requested CPU {target} exceeds cpu_set_t capacity {MAX_CPUSET_BITS}");
        }

        let mut allowed: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe { CPU_ZERO(&mut allowed) };
        let rc = unsafe {
            libc::sched_getaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &mut allowed)
        };
        if rc != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        if !unsafe { CPU_ISSET(target, &allowed) } {
            eyre::bail!("CPU {target} not permitted by current affinity mask");
        }

        let mut desired: libc::cpu_set_t = unsafe { std::mem::zeroed() };
        unsafe {
            CPU_ZERO(&mut desired);
            CPU_SET(target, &mut desired);
        }
        let rc = unsafe {
            libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &desired)
        };
        if rc != 0 {
            return Err(eyre::eyre!(std::io::Error::last_os_error()));
        }
        Ok(())
    }

    RT_ONCE.get_or_init(|| {
        match apply_mem_lock(lock) {
            Ok(()) => tracing::info!(?lock, "memory lock applied"),
            Err(err) => tracing::warn!(error = %err, "mlockall failed"),
        }
        if let Err(err) = apply_fifo_priority(prio) {
            tracing::warn!(
                error = %err,
                "SCHED_FIFO not applied; needs CAP_SYS_NICE or root"
            );
        }
        if let Err(err) = apply_affinity(rt_cpu) {
            tracing::warn!(error = %err, "affinity not applied");
        }
    });
}

#[cfg(target_os = "macos")]
pub fn setup_rt_once(rt: bool, lock: RtLock) {
    use libc::{MCL_CURRENT, MCL_FUTURE, mlockall};
    use std::sync::OnceLock;
    static RT_ONCE: OnceLock<()> = OnceLock::new();

    if !rt {
        return;
    }
    RT_ONCE.get_or_init(|| {
        let flags = match lock {
            RtLock::None => None,
            RtLock::Current => Some(MCL_CURRENT),
            RtLock::All => Some(MCL_CURRENT | MCL_FUTURE),
        };
        if let Some(flags) = flags {
            if unsafe { mlockall(flags) } != 0 {
                let err = std::io::Error::last_os_error();
                tracing::warn!(error = %err, "mlockall failed");
            } else {
                tracing::info!(?lock, "memory lock applied");
            }
        }
        tracing::warn!("macOS does not support SCHED_FIFO or affinity; only mlockall applied");
    });
}
