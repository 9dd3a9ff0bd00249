//! Real-time placement of task threads
//!
//! Each task list can carry a [`TaskRealtime`]: a SCHED_FIFO priority and/or
//! a CPU to pin to. Secondary tasks apply it on their own thread before
//! creating their workers; the main task applies it in `start()` on the
//! driving thread. A placement the host refuses (missing CAP_SYS_NICE, CPU
//! outside the cpuset) is logged and the task runs unplaced.

use crate::error::{CtrlzError, CtrlzResult};
use serde::{Deserialize, Serialize};

/// Highest CPU index a Linux `cpu_set_t` can address
const MAX_CPUS: usize = 1024;

/// Scheduling placement of one task thread
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskRealtime {
    /// SCHED_FIFO priority, 1..=99
    #[serde(rename = "Priority")]
    pub priority: Option<i32>,
    /// CPU core the task thread is pinned to
    #[serde(rename = "Cpu")]
    pub cpu: Option<usize>,
}

impl TaskRealtime {
    pub fn fifo(priority: i32) -> Self {
        Self {
            priority: Some(priority),
            cpu: None,
        }
    }

    pub fn pinned(cpu: usize) -> Self {
        Self {
            priority: None,
            cpu: Some(cpu),
        }
    }

    pub fn on_cpu(mut self, cpu: usize) -> Self {
        self.cpu = Some(cpu);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.priority.is_none() && self.cpu.is_none()
    }

    pub fn validate(&self) -> CtrlzResult<()> {
        if let Some(priority) = self.priority {
            if !(1..=99).contains(&priority) {
                return Err(CtrlzError::config(format!(
                    "Priority must be between 1 and 99, got {}",
                    priority
                )));
            }
        }
        if let Some(cpu) = self.cpu {
            if cpu >= MAX_CPUS {
                return Err(CtrlzError::config(format!("Cpu {} out of range", cpu)));
            }
        }
        Ok(())
    }

    /// Place the calling thread. Affinity goes first so a refused priority
    /// still leaves the thread pinned.
    pub(crate) fn apply(&self, task: &str) -> CtrlzResult<()> {
        self.validate()?;
        if let Some(cpu) = self.cpu {
            pin_current_thread(cpu)?;
            log::info!("Task '{}' pinned to CPU {}", task, cpu);
        }
        if let Some(priority) = self.priority {
            set_fifo_priority(priority)?;
            log::info!("Task '{}' running SCHED_FIFO at priority {}", task, priority);
        }
        Ok(())
    }
}

#[cfg(target_os = "linux")]
fn set_fifo_priority(priority: i32) -> CtrlzResult<()> {
    let param = libc::sched_param {
        sched_priority: priority,
    };
    // pthread_setschedparam reports the error code directly, not via errno
    let rc = unsafe { libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param) };
    if rc != 0 {
        return Err(CtrlzError::Internal(format!(
            "SCHED_FIFO priority {} refused: {} (needs CAP_SYS_NICE)",
            priority,
            std::io::Error::from_raw_os_error(rc)
        )));
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn pin_current_thread(cpu: usize) -> CtrlzResult<()> {
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };
    if rc != 0 {
        return Err(CtrlzError::Internal(format!(
            "Pinning to CPU {} refused: {}",
            cpu,
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

/// Keep every current and future page of the process resident
#[cfg(target_os = "linux")]
pub(crate) fn lock_process_memory() -> CtrlzResult<()> {
    if unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) } != 0 {
        return Err(CtrlzError::Internal(format!(
            "mlockall failed: {} (check ulimit -l)",
            std::io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn set_fifo_priority(_priority: i32) -> CtrlzResult<()> {
    Err(CtrlzError::Unsupported("SCHED_FIFO task priority".to_string()))
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread(_cpu: usize) -> CtrlzResult<()> {
    Err(CtrlzError::Unsupported("CPU pinning".to_string()))
}

#[cfg(not(target_os = "linux"))]
pub(crate) fn lock_process_memory() -> CtrlzResult<()> {
    Err(CtrlzError::Unsupported("memory locking".to_string()))
}
