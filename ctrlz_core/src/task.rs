//! Task control blocks
//!
//! A task list is a named, ordered group of workers sharing one rate. The
//! main task runs inline on the thread calling `spin_once()`; every other
//! task owns one OS thread for its whole lifetime.

use crate::scheduling::TaskRealtime;
use crate::worker::WorkerList;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// Static identity of a task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskInfo {
    pub name: String,
    /// 0 for the main task, 1.. for secondary tasks
    pub id: usize,
    /// The task runs once every `divisor` ticks
    pub divisor: u64,
    pub is_main: bool,
}

impl TaskInfo {
    pub fn new(name: impl Into<String>, id: usize, divisor: u64, is_main: bool) -> Self {
        Self {
            name: name.into(),
            id,
            divisor,
            is_main,
        }
    }
}

/// Snapshot of one task's runtime counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskStats {
    pub name: String,
    pub id: usize,
    pub divisor: u64,
    pub paused: bool,
    pub running: bool,
    /// Completed cycles
    pub cycles: u64,
    /// Pulses that arrived while the previous one was still unconsumed
    pub overruns: u64,
    /// Pulses that fell due while the task was disabled
    pub missed_while_paused: u64,
    /// Real-time placement was requested and the host accepted it
    pub realtime_applied: bool,
}

/// State shared between a task's thread, the scheduler and its handles
pub(crate) struct TaskShared {
    pub info: TaskInfo,
    running: AtomicBool,
    paused: Mutex<bool>,
    gate: Condvar,
    cycles: AtomicU64,
    overruns: AtomicU64,
    missed_while_paused: AtomicU64,
    realtime_applied: AtomicBool,
}

impl TaskShared {
    /// Secondary tasks start paused, the main task never pauses
    pub fn new(info: TaskInfo) -> Self {
        let paused = !info.is_main;
        Self {
            info,
            running: AtomicBool::new(true),
            paused: Mutex::new(paused),
            gate: Condvar::new(),
            cycles: AtomicU64::new(0),
            overruns: AtomicU64::new(0),
            missed_while_paused: AtomicU64::new(0),
            realtime_applied: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.lock()
    }

    /// Flip the pause flag and wake the gate. Returns the previous value.
    pub fn set_paused(&self, paused: bool) -> bool {
        let mut flag = self.paused.lock();
        let previous = *flag;
        *flag = paused;
        self.gate.notify_all();
        previous
    }

    /// Block while paused. Returns false once the task stops running.
    pub fn wait_until_resumed(&self) -> bool {
        let mut paused = self.paused.lock();
        while *paused && self.is_running() {
            self.gate.wait(&mut paused);
        }
        self.is_running()
    }

    /// Clear the running flag under the gate lock so a waiter cannot miss it
    pub fn halt(&self) {
        let _paused = self.paused.lock();
        self.running.store(false, Ordering::Release);
        self.gate.notify_all();
    }

    pub fn next_cycle(&self) -> u64 {
        self.cycles.load(Ordering::Relaxed) + 1
    }

    pub fn record_cycle(&self) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_overrun(&self) -> u64 {
        self.overruns.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn record_missed(&self) {
        self.missed_while_paused.fetch_add(1, Ordering::Relaxed);
    }

    /// Apply `realtime` to the calling thread. Refusals are logged, never fatal.
    pub fn place_thread(&self, realtime: &TaskRealtime) {
        if realtime.is_empty() {
            return;
        }
        match realtime.apply(&self.info.name) {
            Ok(()) => self.realtime_applied.store(true, Ordering::Release),
            Err(e) => log::warn!("Task '{}' runs without real-time placement: {}", self.info.name, e),
        }
    }

    pub fn stats(&self) -> TaskStats {
        TaskStats {
            name: self.info.name.clone(),
            id: self.info.id,
            divisor: self.info.divisor,
            paused: self.is_paused(),
            running: self.is_running(),
            cycles: self.cycles.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            missed_while_paused: self.missed_while_paused.load(Ordering::Relaxed),
            realtime_applied: self.realtime_applied.load(Ordering::Acquire),
        }
    }
}

/// Scheduler-owned part of a task: its workers until start, its thread after
pub(crate) struct TaskControlBlock {
    pub shared: Arc<TaskShared>,
    pub workers: Option<WorkerList>,
    pub thread: Option<JoinHandle<()>>,
    pub realtime: TaskRealtime,
}

impl TaskControlBlock {
    pub fn new(info: TaskInfo) -> Self {
        Self {
            shared: Arc::new(TaskShared::new(info)),
            workers: Some(WorkerList::new()),
            thread: None,
            realtime: TaskRealtime::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.info.name
    }

    /// Join the task thread if one was spawned. The caller must have halted
    /// the task and woken its waits first.
    pub fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::error!("Task '{}' thread panicked", self.name());
            }
        }
    }
}
