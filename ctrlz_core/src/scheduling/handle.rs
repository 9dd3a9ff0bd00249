//! State shared between the driving thread, task threads and handles

use crate::data_center::DataCenter;
use crate::registry::{Channel, ChannelSet};
use crate::scheduling::config::SchedulerConfig;
use crate::task::{TaskShared, TaskStats};
use parking_lot::{Condvar, Mutex, RwLock};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Pulse bookkeeping of one secondary task
pub(crate) struct Pulse {
    pub task: Arc<TaskShared>,
    pub counter: u64,
    pub pending: bool,
    pub tick: u64,
}

pub(crate) struct SyncState {
    pub tick: u64,
    pub pulses: BTreeMap<usize, Pulse>,
}

/// Snapshot of scheduler-wide counters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchedulerStats {
    pub tick: u64,
    /// `spin()` iterations that exceeded `dt`
    pub spin_too_slow: u64,
    /// Times the measured period left the tolerance band
    pub frequency_warnings: u64,
    /// EWMA of the measured period in seconds
    pub measured_dt: f64,
}

pub(crate) struct SchedulerCore<S: ChannelSet> {
    pub data: DataCenter<S>,
    pub config: SchedulerConfig,
    pub name: String,
    /// Mirror of `sync.tick` readable without the lock
    pub tick: AtomicU64,
    pub sync: Mutex<SyncState>,
    pub pulse: Condvar,
    pub tasks: RwLock<BTreeMap<String, Arc<TaskShared>>>,
    pub can_spin: Arc<AtomicBool>,
    pub spin_too_slow: AtomicU64,
    pub frequency_warnings: AtomicU64,
    measured_dt: AtomicU64,
}

impl<S: ChannelSet> SchedulerCore<S> {
    pub fn new(name: String, config: SchedulerConfig) -> Self {
        let measured_dt = AtomicU64::new(config.dt.to_bits());
        Self {
            data: DataCenter::new(),
            config,
            name,
            tick: AtomicU64::new(0),
            sync: Mutex::new(SyncState {
                tick: 0,
                pulses: BTreeMap::new(),
            }),
            pulse: Condvar::new(),
            tasks: RwLock::new(BTreeMap::new()),
            can_spin: Arc::new(AtomicBool::new(false)),
            spin_too_slow: AtomicU64::new(0),
            frequency_warnings: AtomicU64::new(0),
            measured_dt,
        }
    }

    pub fn set_measured_dt(&self, dt: f64) {
        self.measured_dt.store(dt.to_bits(), Ordering::Relaxed);
    }

    /// Advance the tick and pulse every secondary task that falls due.
    /// Returns the new tick.
    pub fn advance(&self) -> u64 {
        let tick = {
            let mut sync = self.sync.lock();
            sync.tick += 1;
            let tick = sync.tick;
            self.tick.store(tick, Ordering::Release);

            for pulse in sync.pulses.values_mut() {
                pulse.counter = (pulse.counter + 1) % pulse.task.info.divisor;
                if pulse.counter != 0 {
                    continue;
                }
                if pulse.task.is_paused() {
                    pulse.task.record_missed();
                    continue;
                }
                if pulse.pending {
                    let total = pulse.task.record_overrun();
                    log::warn!(
                        "Task '{}' is running too slow: pulse at tick {} still pending at tick {} ({} overruns)",
                        pulse.task.info.name,
                        pulse.tick,
                        tick,
                        total
                    );
                }
                pulse.pending = true;
                pulse.tick = tick;
            }
            tick
        };
        self.pulse.notify_all();
        tick
    }

    /// Block until task `id` has a pending pulse. Returns the pulse tick, or
    /// `None` once the task stops running or is removed.
    pub fn wait_for_pulse(&self, task: &TaskShared) -> Option<u64> {
        let mut sync = self.sync.lock();
        loop {
            if !task.is_running() {
                return None;
            }
            match sync.pulses.get(&task.info.id) {
                Some(pulse) if pulse.pending => return Some(pulse.tick),
                Some(_) => {}
                None => return None,
            }
            self.pulse.wait(&mut sync);
        }
    }

    /// Mark task `id`'s pulse consumed
    pub fn complete_pulse(&self, id: usize) {
        if let Some(pulse) = self.sync.lock().pulses.get_mut(&id) {
            pulse.pending = false;
        }
    }

    pub fn enable(&self, name: &str) -> bool {
        let Some(task) = self.lookup(name, "enabled") else {
            return false;
        };
        let mut sync = self.sync.lock();
        if task.set_paused(false) {
            // Re-phase relative to the enable tick
            if let Some(pulse) = sync.pulses.get_mut(&task.info.id) {
                pulse.counter = 0;
            }
            log::info!("Task '{}' enabled at tick {}", name, sync.tick);
        }
        true
    }

    pub fn disable(&self, name: &str) -> bool {
        let Some(task) = self.lookup(name, "disabled") else {
            return false;
        };
        let mut sync = self.sync.lock();
        if !task.set_paused(true) {
            if let Some(pulse) = sync.pulses.get_mut(&task.info.id) {
                pulse.pending = false;
            }
            log::info!("Task '{}' disabled at tick {}", name, sync.tick);
        }
        true
    }

    fn lookup(&self, name: &str, operation: &str) -> Option<Arc<TaskShared>> {
        let task = match self.tasks.read().get(name) {
            Some(task) => task.clone(),
            None => {
                log::error!("Task '{}' does not exist and cannot be {}", name, operation);
                return None;
            }
        };
        if task.info.is_main {
            log::error!("Main thread task '{}' cannot be {}", name, operation);
            return None;
        }
        Some(task)
    }

    /// Halt a task's thread and wake both of its waits
    pub fn halt(&self, task: &TaskShared) {
        let _sync = self.sync.lock();
        task.halt();
        self.pulse.notify_all();
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            tick: self.tick.load(Ordering::Acquire),
            spin_too_slow: self.spin_too_slow.load(Ordering::Relaxed),
            frequency_warnings: self.frequency_warnings.load(Ordering::Relaxed),
            measured_dt: f64::from_bits(self.measured_dt.load(Ordering::Relaxed)),
        }
    }
}

/// Cloneable access to a scheduler for workers and external callbacks.
///
/// Every method is safe to call from any thread, including worker threads.
pub struct SchedulerHandle<S: ChannelSet> {
    core: Arc<SchedulerCore<S>>,
}

impl<S: ChannelSet> Clone for SchedulerHandle<S> {
    fn clone(&self) -> Self {
        Self {
            core: self.core.clone(),
        }
    }
}

impl<S: ChannelSet> SchedulerHandle<S> {
    pub(crate) fn new(core: Arc<SchedulerCore<S>>) -> Self {
        Self { core }
    }

    /// Write channel `C` stamped with the current tick
    #[inline]
    pub fn set_data<C: Channel<Set = S>>(&self, value: C::Value) {
        self.core.data.set_data::<C>(self.timestamp(), value);
    }

    #[inline]
    pub fn get_data<C: Channel<Set = S>>(&self) -> (C::Value, u64) {
        self.core.data.get_data::<C>()
    }

    /// Current scheduler tick
    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.core.tick.load(Ordering::Acquire)
    }

    /// Nominal seconds per tick
    pub fn dt(&self) -> f64 {
        self.core.config.dt
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn data_center(&self) -> &DataCenter<S> {
        &self.core.data
    }

    /// Resume a paused task. False for the main task or an unknown name.
    pub fn enable_task_list(&self, name: &str) -> bool {
        self.core.enable(name)
    }

    /// Pause a task. False for the main task or an unknown name.
    pub fn disable_task_list(&self, name: &str) -> bool {
        self.core.disable(name)
    }

    /// Ask `spin()` to return after the current iteration
    pub fn request_stop(&self) {
        self.core.can_spin.store(false, Ordering::Release);
    }

    pub fn is_spinning(&self) -> bool {
        self.core.can_spin.load(Ordering::Acquire)
    }

    pub fn task_stats(&self, name: &str) -> Option<TaskStats> {
        self.core.tasks.read().get(name).map(|t| t.stats())
    }

    /// Stats of every task, main task first
    pub fn all_task_stats(&self) -> Vec<TaskStats> {
        let mut stats: Vec<_> = self.core.tasks.read().values().map(|t| t.stats()).collect();
        stats.sort_by_key(|s| s.id);
        stats
    }

    pub fn stats(&self) -> SchedulerStats {
        self.core.stats()
    }
}
