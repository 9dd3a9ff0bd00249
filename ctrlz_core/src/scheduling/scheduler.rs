use crate::error::{CtrlzError, CtrlzResult};
use crate::registry::{Channel, ChannelSet};
use crate::scheduling::config::SchedulerConfig;
use crate::scheduling::frequency::{Drift, FrequencyMonitor};
use crate::scheduling::handle::{Pulse, SchedulerCore, SchedulerHandle, SchedulerStats};
use crate::scheduling::realtime::{self, TaskRealtime};
use crate::task::{TaskControlBlock, TaskInfo, TaskShared, TaskStats};
use crate::worker::{CycleInfo, FromConfig, Worker, WorkerList};
use crate::data_center::DataCenter;
use colored::Colorize;
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Created,
    Started,
    Stopped,
}

/// The main task: runs inline on the driving thread
struct MainTask {
    shared: Arc<TaskShared>,
    workers: WorkerList,
    realtime: TaskRealtime,
}

/// Multi-rate scheduler over one channel set.
///
/// Owned by the driving thread. `spin_once()` takes `&mut self`, so only the
/// owner can advance the clock; workers and event callbacks use a
/// [`SchedulerHandle`] instead.
///
/// # Example
/// ```rust,ignore
/// let mut scheduler = Scheduler::<RobotBus>::new(SchedulerConfig::standard())?;
/// scheduler.create_task_list("main", 1, true)?;
/// scheduler.create_task_list("inference", 10, false)?;
/// scheduler.add_worker("main", MotorReader::new(scheduler.handle()))?;
/// scheduler.add_worker("inference", Policy::new(scheduler.handle()))?;
/// scheduler.enable_task_list("inference");
/// scheduler.start()?;
/// scheduler.spin()?;
/// ```
pub struct Scheduler<S: ChannelSet> {
    core: Arc<SchedulerCore<S>>,
    main: Option<MainTask>,
    tasks: BTreeMap<String, TaskControlBlock>,
    next_id: usize,
    state: Lifecycle,
    monitor: FrequencyMonitor,
}

impl<S: ChannelSet> Scheduler<S> {
    pub fn new(config: SchedulerConfig) -> CtrlzResult<Self> {
        Self::with_name("CtrlzScheduler", config)
    }

    pub fn with_name(name: &str, config: SchedulerConfig) -> CtrlzResult<Self> {
        config.validate()?;
        let monitor = FrequencyMonitor::new(config.dt);
        Ok(Self {
            core: Arc::new(SchedulerCore::new(name.to_string(), config)),
            main: None,
            tasks: BTreeMap::new(),
            next_id: 1,
            state: Lifecycle::Created,
            monitor,
        })
    }

    /// Build from a JSON configuration block
    pub fn from_json(config: &serde_json::Value) -> CtrlzResult<Self> {
        Self::new(SchedulerConfig::from_json(config)?)
    }

    pub fn handle(&self) -> SchedulerHandle<S> {
        SchedulerHandle::new(self.core.clone())
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.core.config
    }

    pub fn data_center(&self) -> &DataCenter<S> {
        &self.core.data
    }

    pub fn set_data<C: Channel<Set = S>>(&self, value: C::Value) {
        self.core
            .data
            .set_data::<C>(self.core.tick.load(Ordering::Acquire), value);
    }

    pub fn get_data<C: Channel<Set = S>>(&self) -> (C::Value, u64) {
        self.core.data.get_data::<C>()
    }

    /// Current tick
    pub fn timestamp(&self) -> u64 {
        self.core.tick.load(Ordering::Acquire)
    }

    // ---- task lists -------------------------------------------------------

    /// Create a task list. Returns its id: 0 for the main task, 1.. otherwise.
    ///
    /// Secondary tasks start paused; call `enable_task_list` to let them run.
    /// The main task runs every tick regardless of `divisor`.
    pub fn create_task_list(&mut self, name: &str, divisor: u64, is_main: bool) -> CtrlzResult<usize> {
        self.ensure_created("create task list")?;

        if divisor == 0 {
            return Err(CtrlzError::config(format!(
                "Task '{}' divisor must be at least 1",
                name
            )));
        }
        if self.core.tasks.read().contains_key(name) {
            log::error!("Task '{}' already exists, create task list failed", name);
            return Err(CtrlzError::TaskExists(name.to_string()));
        }

        if is_main {
            if let Some(main) = &self.main {
                log::error!("Main thread task already exists, create task list failed");
                return Err(CtrlzError::MainTaskExists(main.shared.info.name.clone()));
            }
            if divisor != 1 {
                log::warn!("Main task '{}' runs every tick, divisor {} ignored", name, divisor);
            }
            let shared = Arc::new(TaskShared::new(TaskInfo::new(name, 0, 1, true)));
            self.core.tasks.write().insert(name.to_string(), shared.clone());
            self.main = Some(MainTask {
                shared,
                workers: WorkerList::new(),
                realtime: TaskRealtime::default(),
            });
            log::debug!("Created main task '{}'", name);
            return Ok(0);
        }

        let id = self.next_id;
        self.next_id += 1;

        let tcb = TaskControlBlock::new(TaskInfo::new(name, id, divisor, false));
        let shared = tcb.shared.clone();
        self.core.tasks.write().insert(name.to_string(), shared.clone());
        self.core.sync.lock().pulses.insert(
            id,
            Pulse {
                task: shared,
                counter: 0,
                pending: false,
                tick: 0,
            },
        );
        self.tasks.insert(name.to_string(), tcb);
        log::debug!("Created task '{}' (id {}, divisor {})", name, id, divisor);
        Ok(id)
    }

    /// Stop a secondary task, run its workers' `destroy()` and remove it
    pub fn destroy_task_list(&mut self, name: &str) -> CtrlzResult<()> {
        if self.is_main_task(name) {
            return Err(CtrlzError::MainTaskImmutable {
                name: name.to_string(),
                operation: "destroyed",
            });
        }
        let mut tcb = self
            .tasks
            .remove(name)
            .ok_or_else(|| CtrlzError::TaskNotFound(name.to_string()))?;

        self.core.halt(&tcb.shared);
        tcb.join();
        self.core.sync.lock().pulses.remove(&tcb.shared.info.id);
        self.core.tasks.write().remove(name);
        log::info!("Destroyed task '{}'", name);
        Ok(())
    }

    pub fn enable_task_list(&self, name: &str) -> bool {
        self.core.enable(name)
    }

    pub fn disable_task_list(&self, name: &str) -> bool {
        self.core.disable(name)
    }

    /// Append a worker to a task list. Run order is insertion order.
    pub fn add_worker<W: Worker + 'static>(&mut self, task: &str, worker: W) -> CtrlzResult<()> {
        self.ensure_created("add worker")?;
        self.workers_of(task)?.push(Box::new(worker));
        Ok(())
    }

    /// Append several workers in order
    pub fn add_workers<I>(&mut self, task: &str, workers: I) -> CtrlzResult<()>
    where
        I: IntoIterator<Item = Box<dyn Worker>>,
    {
        self.ensure_created("add worker")?;
        let list = self.workers_of(task)?;
        for worker in workers {
            list.push(worker);
        }
        Ok(())
    }

    /// Request a SCHED_FIFO priority and/or CPU pin for a task list.
    ///
    /// Applied in `start()`: on the task's own thread for secondary tasks, on
    /// the calling thread for the main task. Out-of-range values fail here;
    /// a placement the host refuses is only logged.
    pub fn set_task_realtime(&mut self, task: &str, realtime: TaskRealtime) -> CtrlzResult<()> {
        self.ensure_created("set task real-time placement")?;
        realtime.validate()?;
        if let Some(main) = self.main.as_mut() {
            if main.shared.info.name == task {
                main.realtime = realtime;
                return Ok(());
            }
        }
        let tcb = self
            .tasks
            .get_mut(task)
            .ok_or_else(|| CtrlzError::TaskNotFound(task.to_string()))?;
        tcb.realtime = realtime;
        Ok(())
    }

    /// Build a worker from its configuration. The caller keeps ownership.
    pub fn create_worker<W: FromConfig<S>>(&self, config: &serde_json::Value) -> CtrlzResult<W> {
        W::from_config(self.handle(), config)
    }

    /// Build a worker from its configuration and hand it to a task list
    pub fn spawn_worker<W: FromConfig<S> + 'static>(
        &mut self,
        task: &str,
        config: &serde_json::Value,
    ) -> CtrlzResult<()> {
        let worker = self.create_worker::<W>(config)?;
        self.add_worker(task, worker)
    }

    fn workers_of(&mut self, task: &str) -> CtrlzResult<&mut WorkerList> {
        if let Some(main) = self.main.as_mut() {
            if main.shared.info.name == task {
                return Ok(&mut main.workers);
            }
        }
        self.tasks
            .get_mut(task)
            .and_then(|tcb| tcb.workers.as_mut())
            .ok_or_else(|| CtrlzError::TaskNotFound(task.to_string()))
    }

    fn is_main_task(&self, name: &str) -> bool {
        self.main
            .as_ref()
            .is_some_and(|main| main.shared.info.name == name)
    }

    fn ensure_created(&self, operation: &str) -> CtrlzResult<()> {
        match self.state {
            Lifecycle::Created => Ok(()),
            Lifecycle::Started => Err(CtrlzError::invalid_state(format!(
                "cannot {} after the scheduler started",
                operation
            ))),
            Lifecycle::Stopped => Err(CtrlzError::invalid_state(format!(
                "cannot {} on a stopped scheduler",
                operation
            ))),
        }
    }

    // ---- lifecycle --------------------------------------------------------

    /// Spawn one thread per secondary task, create the main task's workers on
    /// this thread, wait `SettleTime`, then enable spinning.
    pub fn start(&mut self) -> CtrlzResult<()> {
        match self.state {
            Lifecycle::Created => {}
            Lifecycle::Started => return Err(CtrlzError::invalid_state("scheduler already started")),
            Lifecycle::Stopped => {
                return Err(CtrlzError::invalid_state(
                    "a stopped scheduler cannot be restarted",
                ))
            }
        }
        self.state = Lifecycle::Started;

        if self.core.config.lock_memory {
            match realtime::lock_process_memory() {
                Ok(()) => log::info!("Process memory locked"),
                Err(e) => log::warn!("Continuing with pageable memory: {}", e),
            }
        }

        for tcb in self.tasks.values_mut() {
            let Some(workers) = tcb.workers.take() else {
                continue;
            };
            let core = self.core.clone();
            let shared = tcb.shared.clone();
            let placement = tcb.realtime;
            let handle = thread::Builder::new()
                .name(format!("ctrlz-{}", shared.info.name))
                .spawn(move || task_thread(core, shared, placement, workers))?;
            tcb.thread = Some(handle);
        }

        if let Some(main) = self.main.as_mut() {
            main.shared.place_thread(&main.realtime);
            main.workers.create_all(&main.shared.info);
        }

        if self.core.config.settle_time > 0.0 {
            thread::sleep(Duration::from_secs_f64(self.core.config.settle_time));
        }

        if self.core.config.print_banner {
            self.print_banner();
        }
        log::info!(
            "Scheduler '{}' started: dt {}s, {} secondary task(s)",
            self.core.name,
            self.core.config.dt,
            self.tasks.len()
        );

        self.core.can_spin.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop every task thread, destroy all workers. Idempotent.
    pub fn stop(&mut self) {
        match self.state {
            Lifecycle::Stopped => return,
            Lifecycle::Created => {
                self.state = Lifecycle::Stopped;
                return;
            }
            Lifecycle::Started => {}
        }
        self.state = Lifecycle::Stopped;
        self.core.can_spin.store(false, Ordering::Release);

        for tcb in self.tasks.values() {
            self.core.halt(&tcb.shared);
        }
        for tcb in self.tasks.values_mut() {
            tcb.join();
        }

        if let Some(main) = self.main.as_mut() {
            main.workers.destroy_all(&main.shared.info);
            main.shared.halt();
        }

        log::info!(
            "Scheduler '{}' stopped at tick {}",
            self.core.name,
            self.timestamp()
        );
    }

    pub fn is_started(&self) -> bool {
        self.state == Lifecycle::Started
    }

    fn print_banner(&self) {
        println!(
            "{} {}",
            "CTRL-Z".green().bold(),
            format!("scheduler '{}' is running", self.core.name).bold()
        );
        println!(
            "   dt: {}s ({:.1} Hz)",
            self.core.config.dt,
            self.core.config.frequency()
        );
        if let Some(main) = &self.main {
            println!(
                "   {} {} ({} workers)",
                "main:".cyan(),
                main.shared.info.name,
                main.workers.len()
            );
        }
        for tcb in self.tasks.values() {
            println!(
                "   {} {} (every {} ticks)",
                "task:".cyan(),
                tcb.name(),
                tcb.shared.info.divisor
            );
        }
    }

    // ---- spinning ---------------------------------------------------------

    /// Advance one tick: pulse due tasks, then run the main task inline.
    ///
    /// Must only be called from the thread that owns the scheduler.
    pub fn spin_once(&mut self) -> CtrlzResult<u64> {
        if self.state != Lifecycle::Started {
            log::warn!("Scheduler '{}' is not started, spin_once ignored", self.core.name);
            return Err(CtrlzError::invalid_state("spin_once called before start"));
        }

        if self.core.config.check_frequency {
            self.check_frequency();
        }

        let tick = self.core.advance();

        if let Some(main) = self.main.as_mut() {
            let cycle = CycleInfo {
                task: &main.shared.info,
                tick,
                cycle: main.shared.next_cycle(),
            };
            main.workers.run_cycle(&cycle);
            main.shared.record_cycle();
        }

        Ok(tick)
    }

    fn check_frequency(&mut self) {
        let drift = self.monitor.sample(Instant::now());
        self.core.set_measured_dt(self.monitor.estimate());
        match drift {
            Drift::Left(estimate) => {
                self.core.frequency_warnings.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "Measured period {:.6}s drifted from dt {:.6}s",
                    estimate,
                    self.core.config.dt
                );
            }
            Drift::Recovered(estimate) => {
                log::info!("Measured period back to {:.6}s", estimate);
            }
            Drift::InBand | Drift::StillOut => {}
        }
    }

    /// Drive `spin_once()` every `dt` until stop is requested
    pub fn spin(&mut self) -> CtrlzResult<()> {
        self.spin_until(None)
    }

    /// Like [`spin`](Self::spin), bounded by wall time
    pub fn spin_for(&mut self, duration: Duration) -> CtrlzResult<()> {
        self.spin_until(Some(Instant::now() + duration))
    }

    fn spin_until(&mut self, deadline: Option<Instant>) -> CtrlzResult<()> {
        if self.state != Lifecycle::Started {
            return Err(CtrlzError::invalid_state("spin called before start"));
        }

        let period = Duration::from_secs_f64(self.core.config.dt);
        while self.core.can_spin.load(Ordering::Acquire) {
            if deadline.is_some_and(|d| Instant::now() >= d) {
                log::info!("Scheduler '{}' reached its time limit", self.core.name);
                break;
            }

            let begin = Instant::now();
            self.spin_once()?;
            let elapsed = begin.elapsed();

            if elapsed < period {
                thread::sleep(period - elapsed);
            } else {
                self.core.spin_too_slow.fetch_add(1, Ordering::Relaxed);
                log::warn!(
                    "spin_once is too slow: {:.3}ms for a {:.3}ms period",
                    elapsed.as_secs_f64() * 1e3,
                    period.as_secs_f64() * 1e3
                );
            }
        }
        Ok(())
    }

    /// Make Ctrl-C request a stop of the spin loop. Failure is logged.
    pub fn install_signal_handler(&self) {
        let can_spin = self.core.can_spin.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            eprintln!("{}", "\nCtrl+C received! Stopping CTRL-Z scheduler...".red());
            can_spin.store(false, Ordering::Release);
        }) {
            log::warn!("Failed to set signal handler: {}", e);
        }
    }

    // ---- introspection ----------------------------------------------------

    pub fn task_stats(&self, name: &str) -> Option<TaskStats> {
        self.core.tasks.read().get(name).map(|t| t.stats())
    }

    pub fn stats(&self) -> SchedulerStats {
        self.core.stats()
    }

    /// Task names, main task first
    pub fn task_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.main.iter().map(|m| m.shared.info.name.clone()).collect();
        names.extend(self.tasks.keys().cloned());
        names
    }
}

impl<S: ChannelSet> Drop for Scheduler<S> {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of a secondary task thread
fn task_thread<S: ChannelSet>(
    core: Arc<SchedulerCore<S>>,
    task: Arc<TaskShared>,
    placement: TaskRealtime,
    mut workers: WorkerList,
) {
    task.place_thread(&placement);
    workers.create_all(&task.info);

    loop {
        if !task.wait_until_resumed() {
            break;
        }
        let Some(tick) = core.wait_for_pulse(&task) else {
            break;
        };

        let cycle = CycleInfo {
            task: &task.info,
            tick,
            cycle: task.next_cycle(),
        };
        workers.run_cycle(&cycle);
        core.complete_pulse(task.info.id);
        task.record_cycle();
    }

    workers.destroy_all(&task.info);
    log::debug!("Task '{}' thread exiting", task.info.name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    crate::channels! {
        TestBus {
            Counter: u64,
        }
    }

    struct CounterWorker {
        count: Arc<AtomicUsize>,
        handle: SchedulerHandle<TestBus>,
    }

    impl Worker for CounterWorker {
        fn run(&mut self, _cycle: &CycleInfo<'_>) {
            let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
            self.handle.set_data::<Counter>(n as u64);
        }
    }

    fn scheduler() -> Scheduler<TestBus> {
        Scheduler::new(SchedulerConfig::simulation(0.001)).unwrap()
    }

    #[test]
    fn test_task_ids() {
        let mut sched = scheduler();
        assert_eq!(sched.create_task_list("io", 2, false).unwrap(), 1);
        assert_eq!(sched.create_task_list("main", 1, true).unwrap(), 0);
        assert_eq!(sched.create_task_list("slow", 10, false).unwrap(), 2);
        assert_eq!(sched.task_names(), vec!["main", "io", "slow"]);
    }

    #[test]
    fn test_duplicate_tasks_rejected() {
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        assert!(matches!(
            sched.create_task_list("main", 1, false),
            Err(CtrlzError::TaskExists(_))
        ));
        assert!(matches!(
            sched.create_task_list("other", 1, true),
            Err(CtrlzError::MainTaskExists(name)) if name == "main"
        ));
        assert!(matches!(
            sched.create_task_list("zero", 0, false),
            Err(CtrlzError::Config(_))
        ));
    }

    #[test]
    fn test_main_task_is_immutable() {
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        assert!(!sched.enable_task_list("main"));
        assert!(!sched.disable_task_list("main"));
        assert!(!sched.enable_task_list("missing"));
        assert!(matches!(
            sched.destroy_task_list("main"),
            Err(CtrlzError::MainTaskImmutable { .. })
        ));
        assert!(matches!(
            sched.destroy_task_list("missing"),
            Err(CtrlzError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_spin_before_start_fails() {
        let mut sched = scheduler();
        assert!(matches!(sched.spin_once(), Err(CtrlzError::InvalidState(_))));
        assert!(sched.spin().is_err());
        assert_eq!(sched.timestamp(), 0);
    }

    #[test]
    fn test_main_task_runs_every_tick() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        let worker = CounterWorker {
            count: count.clone(),
            handle: sched.handle(),
        };
        sched.add_worker("main", worker).unwrap();
        sched.start().unwrap();

        for expected in 1..=5 {
            assert_eq!(sched.spin_once().unwrap(), expected);
        }

        assert_eq!(count.load(Ordering::SeqCst), 5);
        // Written during tick 5 with the tick as timestamp
        assert_eq!(sched.get_data::<Counter>(), (5, 5));
        assert_eq!(sched.task_stats("main").unwrap().cycles, 5);
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        sched.start().unwrap();

        assert!(sched.start().is_err());
        assert!(matches!(
            sched.create_task_list("late", 1, false),
            Err(CtrlzError::InvalidState(_))
        ));
        assert!(matches!(
            sched.add_workers("main", Vec::<Box<dyn Worker>>::new()),
            Err(CtrlzError::InvalidState(_))
        ));

        sched.stop();
        sched.stop();
        assert!(!sched.is_started());
        assert!(sched.start().is_err());
        assert!(sched.spin_once().is_err());
    }

    #[test]
    fn test_add_worker_to_unknown_task() {
        let mut sched = scheduler();
        let worker = CounterWorker {
            count: Arc::default(),
            handle: sched.handle(),
        };
        assert!(matches!(
            sched.add_worker("nowhere", worker),
            Err(CtrlzError::TaskNotFound(_))
        ));
    }

    #[test]
    fn test_spin_for_honors_request_stop() {
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        sched.start().unwrap();

        let handle = sched.handle();
        assert!(handle.is_spinning());
        handle.request_stop();
        sched.spin_for(Duration::from_secs(5)).unwrap();
        assert!(!handle.is_spinning());
        assert_eq!(sched.timestamp(), 0);
    }
    fn wait_for(mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        done()
    }

    #[test]
    fn test_task_realtime_is_validated_up_front() {
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        sched.create_task_list("io", 1, false).unwrap();

        assert!(matches!(
            sched.set_task_realtime("nowhere", TaskRealtime::fifo(50)),
            Err(CtrlzError::TaskNotFound(_))
        ));
        assert!(matches!(
            sched.set_task_realtime("io", TaskRealtime::fifo(120)),
            Err(CtrlzError::Config(_))
        ));
        assert!(sched.set_task_realtime("io", TaskRealtime::fifo(50).on_cpu(0)).is_ok());
        assert!(sched.set_task_realtime("main", TaskRealtime::default()).is_ok());

        sched.start().unwrap();
        assert!(matches!(
            sched.set_task_realtime("io", TaskRealtime::fifo(50)),
            Err(CtrlzError::InvalidState(_))
        ));
    }

    #[test]
    fn test_refused_priority_does_not_stop_the_task() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut sched = scheduler();
        sched.create_task_list("io", 1, false).unwrap();
        // Granted when running with CAP_SYS_NICE, refused otherwise
        sched.set_task_realtime("io", TaskRealtime::fifo(1)).unwrap();
        let worker = CounterWorker {
            count: count.clone(),
            handle: sched.handle(),
        };
        sched.add_worker("io", worker).unwrap();
        sched.start().unwrap();
        sched.enable_task_list("io");

        sched.spin_once().unwrap();
        assert!(wait_for(|| sched.task_stats("io").unwrap().cycles == 1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        sched.stop();
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_secondary_task_pinned_on_its_own_thread() {
        struct CpuReporter(std::sync::mpsc::Sender<i32>);

        impl Worker for CpuReporter {
            fn create(&mut self, _task: &TaskInfo) -> CtrlzResult<()> {
                let _ = self.0.send(unsafe { libc::sched_getcpu() });
                Ok(())
            }

            fn run(&mut self, _cycle: &CycleInfo<'_>) {}
        }

        // A CPU this process is allowed to run on
        let cpu = unsafe { libc::sched_getcpu() };
        assert!(cpu >= 0);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut sched = scheduler();
        sched.create_task_list("io", 1, false).unwrap();
        sched.set_task_realtime("io", TaskRealtime::pinned(cpu as usize)).unwrap();
        sched.add_worker("io", CpuReporter(tx)).unwrap();
        sched.start().unwrap();

        let seen = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(seen, cpu);
        assert!(sched.task_stats("io").unwrap().realtime_applied);
        sched.stop();
    }
}
