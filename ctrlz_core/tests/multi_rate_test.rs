// Multi-rate scheduling behavior across real task threads
use ctrlz_core::error::{CtrlzError, CtrlzResult};
use ctrlz_core::{channels, CycleInfo, Scheduler, SchedulerConfig, SchedulerHandle, TaskInfo, Worker};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

channels! {
    TestBus {
        MainCount: u64,
        SlowTick: u64,
    }
}

const TIMEOUT: Duration = Duration::from_secs(10);

fn wait_until<F: Fn() -> bool>(cond: F) {
    let deadline = Instant::now() + TIMEOUT;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached in time");
        thread::sleep(Duration::from_millis(1));
    }
}

fn cycles(sched: &Scheduler<TestBus>, task: &str) -> u64 {
    sched.task_stats(task).map(|s| s.cycles).unwrap_or(0)
}

/// Spin `n` times, letting `task` finish each cycle it was pulsed for
/// before the next tick so no pulse is ever dropped.
fn spin_paced(sched: &mut Scheduler<TestBus>, task: &str, divisor: u64, n: u64) {
    let enable_tick = sched.timestamp();
    let base = cycles(sched, task);
    for _ in 0..n {
        let tick = sched.spin_once().unwrap();
        if (tick - enable_tick) % divisor == 0 {
            let expected = base + (tick - enable_tick) / divisor;
            wait_until(|| cycles(&*sched, task) == expected);
        }
    }
}

fn scheduler() -> Scheduler<TestBus> {
    Scheduler::new(SchedulerConfig::simulation(0.001)).unwrap()
}

struct CounterWorker {
    count: Arc<AtomicUsize>,
    handle: SchedulerHandle<TestBus>,
}

impl Worker for CounterWorker {
    fn run(&mut self, _cycle: &CycleInfo<'_>) {
        let n = self.count.fetch_add(1, Ordering::SeqCst) + 1;
        self.handle.set_data::<MainCount>(n as u64);
    }
}

struct TickRecorder {
    ticks: Arc<Mutex<Vec<u64>>>,
    handle: SchedulerHandle<TestBus>,
}

impl Worker for TickRecorder {
    fn run(&mut self, cycle: &CycleInfo<'_>) {
        self.ticks.lock().push(cycle.tick);
        self.handle.set_data::<SlowTick>(cycle.tick);
    }
}

#[derive(Default)]
struct Lifecycle {
    created: AtomicUsize,
    destroyed: AtomicUsize,
}

struct LifecycleWorker {
    counts: Arc<Lifecycle>,
    fail_create: bool,
}

impl Worker for LifecycleWorker {
    fn create(&mut self, _task: &TaskInfo) -> CtrlzResult<()> {
        self.counts.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_create {
            return Err(CtrlzError::worker("simulated open failure"));
        }
        Ok(())
    }

    fn run(&mut self, _cycle: &CycleInfo<'_>) {}

    fn destroy(&mut self, _task: &TaskInfo) {
        self.counts.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_main_and_slow_task_scenario() {
    let count = Arc::new(AtomicUsize::new(0));
    let ticks = Arc::new(Mutex::new(Vec::new()));

    let mut sched = scheduler();
    sched.create_task_list("main", 1, true).unwrap();
    sched.create_task_list("Slow", 10, false).unwrap();
    sched
        .add_worker(
            "main",
            CounterWorker {
                count: count.clone(),
                handle: sched.handle(),
            },
        )
        .unwrap();
    sched
        .add_worker(
            "Slow",
            TickRecorder {
                ticks: ticks.clone(),
                handle: sched.handle(),
            },
        )
        .unwrap();
    assert!(sched.enable_task_list("Slow"));
    sched.start().unwrap();

    spin_paced(&mut sched, "Slow", 10, 100);
    sched.stop();

    assert_eq!(count.load(Ordering::SeqCst), 100);
    assert_eq!(*ticks.lock(), (1..=10).map(|i| i * 10).collect::<Vec<u64>>());
    assert_eq!(sched.get_data::<MainCount>(), (100, 100));
    assert_eq!(sched.get_data::<SlowTick>(), (100, 100));

    let slow = sched.task_stats("Slow").unwrap();
    assert_eq!(slow.cycles, 10);
    assert_eq!(slow.overruns, 0);
    assert!(!slow.running);
}

#[test]
fn test_divisor_phase_follows_enable_tick() {
    for divisor in [1u64, 2, 10, 100] {
        let ticks = Arc::new(Mutex::new(Vec::new()));
        let mut sched = scheduler();
        sched.create_task_list("main", 1, true).unwrap();
        sched.create_task_list("rated", divisor, false).unwrap();
        sched
            .add_worker(
                "rated",
                TickRecorder {
                    ticks: ticks.clone(),
                    handle: sched.handle(),
                },
            )
            .unwrap();
        sched.start().unwrap();

        // Paused: nothing runs, the phase is set at enable time
        for _ in 0..3 {
            sched.spin_once().unwrap();
        }
        assert!(sched.enable_task_list("rated"));
        spin_paced(&mut sched, "rated", divisor, 3 * divisor);
        sched.stop();

        let expected: Vec<u64> = (1..=3).map(|k| 3 + k * divisor).collect();
        assert_eq!(*ticks.lock(), expected, "divisor {}", divisor);
    }
}

#[test]
fn test_disabled_task_runs_nothing_and_resumes_without_backlog() {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let mut sched = scheduler();
    sched.create_task_list("main", 1, true).unwrap();
    sched.create_task_list("io", 2, false).unwrap();
    sched
        .add_worker(
            "io",
            TickRecorder {
                ticks: ticks.clone(),
                handle: sched.handle(),
            },
        )
        .unwrap();
    sched.enable_task_list("io");
    sched.start().unwrap();

    spin_paced(&mut sched, "io", 2, 4);
    assert_eq!(*ticks.lock(), vec![2, 4]);

    let handle = sched.handle();
    assert!(handle.disable_task_list("io"));
    for _ in 0..10 {
        sched.spin_once().unwrap();
    }
    thread::sleep(Duration::from_millis(50));
    let stats = sched.task_stats("io").unwrap();
    assert_eq!(stats.cycles, 2);
    assert!(stats.paused);
    assert_eq!(stats.missed_while_paused, 5);

    // Re-enabled at tick 14: next cycles at 16 and 18, nothing replayed
    assert!(handle.enable_task_list("io"));
    spin_paced(&mut sched, "io", 2, 4);
    sched.stop();

    assert_eq!(*ticks.lock(), vec![2, 4, 16, 18]);
    assert_eq!(sched.task_stats("io").unwrap().overruns, 0);
}

#[test]
fn test_three_phase_order_on_secondary_task() {
    struct Phase {
        id: &'static str,
        journal: Arc<Mutex<Vec<String>>>,
    }

    impl Worker for Phase {
        fn cycle_begin(&mut self, _cycle: &CycleInfo<'_>) {
            self.journal.lock().push(format!("{}.begin", self.id));
        }
        fn run(&mut self, _cycle: &CycleInfo<'_>) {
            self.journal.lock().push(format!("{}.run", self.id));
        }
        fn cycle_end(&mut self, _cycle: &CycleInfo<'_>) {
            self.journal.lock().push(format!("{}.end", self.id));
        }
    }

    let journal = Arc::new(Mutex::new(Vec::new()));
    let mut sched = scheduler();
    sched.create_task_list("ctrl", 1, false).unwrap();
    let workers: Vec<Box<dyn Worker>> = ["W1", "W2", "W3"]
        .into_iter()
        .map(|id| {
            Box::new(Phase {
                id,
                journal: journal.clone(),
            }) as Box<dyn Worker>
        })
        .collect();
    sched.add_workers("ctrl", workers).unwrap();
    sched.enable_task_list("ctrl");
    sched.start().unwrap();

    spin_paced(&mut sched, "ctrl", 1, 1);
    sched.stop();

    assert_eq!(
        *journal.lock(),
        vec![
            "W1.begin", "W2.begin", "W3.begin", "W1.run", "W2.run", "W3.run", "W1.end", "W2.end",
            "W3.end"
        ]
    );
}

#[test]
fn test_overrun_counted_once_per_missed_pulse() {
    struct Stuck {
        entered: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
        first: bool,
    }

    impl Worker for Stuck {
        fn run(&mut self, _cycle: &CycleInfo<'_>) {
            if self.first {
                self.first = false;
                self.entered.send(()).unwrap();
                self.release.recv().unwrap();
            }
        }
    }

    let (entered_tx, entered_rx) = mpsc::channel();
    let (release_tx, release_rx) = mpsc::channel();

    let mut sched = scheduler();
    sched.create_task_list("busy", 1, false).unwrap();
    sched
        .add_worker(
            "busy",
            Stuck {
                entered: entered_tx,
                release: release_rx,
                first: true,
            },
        )
        .unwrap();
    sched.enable_task_list("busy");
    sched.start().unwrap();

    sched.spin_once().unwrap();
    entered_rx.recv_timeout(TIMEOUT).unwrap();

    for _ in 0..3 {
        sched.spin_once().unwrap();
    }
    assert_eq!(sched.task_stats("busy").unwrap().overruns, 3);

    release_tx.send(()).unwrap();
    wait_until(|| cycles(&sched, "busy") == 1);

    // Caught up: the next pulse is consumed normally
    spin_paced(&mut sched, "busy", 1, 2);
    sched.stop();

    let stats = sched.task_stats("busy").unwrap();
    assert_eq!(stats.overruns, 3);
    assert_eq!(stats.cycles, 3);
}

#[test]
fn test_every_created_worker_is_destroyed_once() {
    let counts = Arc::new(Lifecycle::default());
    let worker = |fail_create| LifecycleWorker {
        counts: counts.clone(),
        fail_create,
    };

    let mut sched = scheduler();
    sched.create_task_list("main", 1, true).unwrap();
    sched.create_task_list("fast", 1, false).unwrap();
    sched.create_task_list("idle", 5, false).unwrap();
    sched.add_worker("main", worker(false)).unwrap();
    sched.add_worker("main", worker(true)).unwrap();
    sched.add_worker("fast", worker(false)).unwrap();
    sched.add_worker("idle", worker(false)).unwrap();
    sched.enable_task_list("fast");
    sched.start().unwrap();

    spin_paced(&mut sched, "fast", 1, 5);
    wait_until(|| counts.created.load(Ordering::SeqCst) == 4);

    sched.stop();
    assert_eq!(counts.created.load(Ordering::SeqCst), 4);
    assert_eq!(counts.destroyed.load(Ordering::SeqCst), 4);

    let handle = sched.handle();
    for stats in handle.all_task_stats() {
        assert!(!stats.running, "task {} still running", stats.name);
    }

    sched.stop();
    drop(sched);
    assert_eq!(counts.destroyed.load(Ordering::SeqCst), 4);
}

#[test]
fn test_drop_stops_running_scheduler() {
    let counts = Arc::new(Lifecycle::default());
    {
        let mut sched = scheduler();
        sched.create_task_list("bg", 3, false).unwrap();
        sched
            .add_worker(
                "bg",
                LifecycleWorker {
                    counts: counts.clone(),
                    fail_create: false,
                },
            )
            .unwrap();
        sched.start().unwrap();
        wait_until(|| counts.created.load(Ordering::SeqCst) == 1);
    }
    assert_eq!(counts.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_destroy_task_list_while_running() {
    let counts = Arc::new(Lifecycle::default());
    let mut sched = scheduler();
    sched.create_task_list("main", 1, true).unwrap();
    sched.create_task_list("aux", 1, false).unwrap();
    sched
        .add_worker(
            "aux",
            LifecycleWorker {
                counts: counts.clone(),
                fail_create: false,
            },
        )
        .unwrap();
    sched.enable_task_list("aux");
    sched.start().unwrap();
    spin_paced(&mut sched, "aux", 1, 3);

    sched.destroy_task_list("aux").unwrap();
    assert_eq!(counts.destroyed.load(Ordering::SeqCst), 1);
    assert!(sched.task_stats("aux").is_none());
    assert!(!sched.enable_task_list("aux"));

    // Ticks keep flowing without the removed task
    sched.spin_once().unwrap();
    sched.stop();
    assert_eq!(counts.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_handle_controls_from_another_thread() {
    let ticks = Arc::new(Mutex::new(Vec::new()));
    let mut sched = scheduler();
    sched.create_task_list("main", 1, true).unwrap();
    sched.create_task_list("late", 1, false).unwrap();
    sched
        .add_worker(
            "late",
            TickRecorder {
                ticks: ticks.clone(),
                handle: sched.handle(),
            },
        )
        .unwrap();
    sched.start().unwrap();

    for _ in 0..5 {
        sched.spin_once().unwrap();
    }

    let handle = sched.handle();
    thread::spawn(move || {
        assert!(handle.enable_task_list("late"));
        assert!(!handle.disable_task_list("main"));
    })
    .join()
    .unwrap();

    spin_paced(&mut sched, "late", 1, 2);
    sched.stop();
    assert_eq!(*ticks.lock(), vec![6, 7]);
}
