//! Worker lifecycle contract
//!
//! A worker is the unit of work a task list runs every due cycle. The
//! scheduler calls, per worker:
//!
//! 1. `create()` once, on the thread that will run the worker
//! 2. `cycle_begin()`, `run()`, `cycle_end()` once per due cycle, each phase
//!    for every worker of the task before the next phase starts
//! 3. `destroy()` once when the owning task stops
//!
//! Only `run()` is required.

use crate::error::CtrlzResult;
use crate::registry::ChannelSet;
use crate::scheduling::SchedulerHandle;
use crate::task::TaskInfo;
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-cycle context handed to every worker phase
#[derive(Debug, Clone, Copy)]
pub struct CycleInfo<'a> {
    /// Task running this cycle
    pub task: &'a TaskInfo,
    /// Scheduler tick that released this cycle
    pub tick: u64,
    /// 1-based count of cycles this task has run
    pub cycle: u64,
}

pub trait Worker: Send {
    /// Name used in diagnostics
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Acquire thread-affine resources. Called once before the first cycle.
    fn create(&mut self, _task: &TaskInfo) -> CtrlzResult<()> {
        Ok(())
    }

    fn cycle_begin(&mut self, _cycle: &CycleInfo<'_>) {}

    fn run(&mut self, cycle: &CycleInfo<'_>);

    fn cycle_end(&mut self, _cycle: &CycleInfo<'_>) {}

    /// Release everything acquired in `create()`. Also called when `create()`
    /// failed, so it must tolerate partial initialization.
    fn destroy(&mut self, _task: &TaskInfo) {}
}

impl<W: Worker + ?Sized> Worker for Box<W> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn create(&mut self, task: &TaskInfo) -> CtrlzResult<()> {
        (**self).create(task)
    }

    fn cycle_begin(&mut self, cycle: &CycleInfo<'_>) {
        (**self).cycle_begin(cycle)
    }

    fn run(&mut self, cycle: &CycleInfo<'_>) {
        (**self).run(cycle)
    }

    fn cycle_end(&mut self, cycle: &CycleInfo<'_>) {
        (**self).cycle_end(cycle)
    }

    fn destroy(&mut self, task: &TaskInfo) {
        (**self).destroy(task)
    }
}

/// Shared handle to an externally owned worker.
///
/// The application keeps one clone to inspect or reconfigure the worker; the
/// task list holds the other. The lock is taken once per phase.
impl<W: Worker> Worker for Arc<Mutex<W>> {
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<W>())
    }

    fn create(&mut self, task: &TaskInfo) -> CtrlzResult<()> {
        self.lock().create(task)
    }

    fn cycle_begin(&mut self, cycle: &CycleInfo<'_>) {
        self.lock().cycle_begin(cycle)
    }

    fn run(&mut self, cycle: &CycleInfo<'_>) {
        self.lock().run(cycle)
    }

    fn cycle_end(&mut self, cycle: &CycleInfo<'_>) {
        self.lock().cycle_end(cycle)
    }

    fn destroy(&mut self, task: &TaskInfo) {
        self.lock().destroy(task)
    }
}

/// Workers constructible from a scheduler handle and a configuration document
pub trait FromConfig<S: ChannelSet>: Worker + Sized {
    fn from_config(handle: SchedulerHandle<S>, config: &serde_json::Value) -> CtrlzResult<Self>;
}

fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    match base.rfind("::") {
        Some(pos) => &full[pos + 2..],
        None => full,
    }
}

struct WorkerSlot {
    worker: Box<dyn Worker>,
    created: bool,
    active: bool,
}

/// Ordered workers of one task list
#[derive(Default)]
pub(crate) struct WorkerList {
    slots: Vec<WorkerSlot>,
}

impl WorkerList {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub fn push(&mut self, worker: Box<dyn Worker>) {
        self.slots.push(WorkerSlot {
            worker,
            created: false,
            active: false,
        });
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Call `create()` on every worker in order. A worker whose create fails
    /// is skipped in cycles but still destroyed.
    pub fn create_all(&mut self, task: &TaskInfo) {
        for slot in self.slots.iter_mut() {
            slot.created = true;
            match slot.worker.create(task) {
                Ok(()) => {
                    slot.active = true;
                    log::debug!("Created worker '{}' in task '{}'", slot.worker.name(), task.name);
                }
                Err(e) => {
                    slot.active = false;
                    log::error!(
                        "Failed to create worker '{}' in task '{}': {}",
                        slot.worker.name(),
                        task.name,
                        e
                    );
                }
            }
        }
    }

    /// Run the three phases over all active workers
    pub fn run_cycle(&mut self, cycle: &CycleInfo<'_>) {
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.worker.cycle_begin(cycle);
        }
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.worker.run(cycle);
        }
        for slot in self.slots.iter_mut().filter(|s| s.active) {
            slot.worker.cycle_end(cycle);
        }
    }

    /// Call `destroy()` once on every worker that was created
    pub fn destroy_all(&mut self, task: &TaskInfo) {
        for slot in self.slots.iter_mut().filter(|s| s.created) {
            slot.worker.destroy(task);
            slot.created = false;
            slot.active = false;
        }
    }
}
