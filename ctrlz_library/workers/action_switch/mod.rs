use ctrlz_core::error::{CtrlzError, CtrlzResult};
use ctrlz_core::{Channel, ChannelSet, CycleInfo, FromConfig, SchedulerHandle, Worker};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type Remap<S, V> = Box<dyn FnMut(&SchedulerHandle<S>, V) + Send>;

struct Source<S: ChannelSet, V> {
    name: &'static str,
    read: fn(&SchedulerHandle<S>) -> (V, u64),
    remap: Option<Remap<S, V>>,
}

fn read_channel<C: Channel>(handle: &SchedulerHandle<C::Set>) -> (C::Value, u64) {
    handle.get_data::<C>()
}

#[derive(Debug, Default)]
struct SwitchState {
    names: Vec<&'static str>,
    active: Option<usize>,
    /// Source to activate and the absolute tick it becomes due
    pending: Option<(usize, u64)>,
    blocked: bool,
}

/// Worker-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSwitchConfig {
    /// Default delay before a requested switch takes effect, in seconds
    #[serde(rename = "SwitchIntervalTime", default = "default_interval")]
    pub switch_interval_time: f64,
}

fn default_interval() -> f64 {
    1.0
}

/// Thread-safe remote for an [`ActionSwitchWorker`].
///
/// Event callbacks (joystick, ROS topics, operator console) hold a clone and
/// request switches while the worker runs on its task thread.
pub struct ActionSwitchControl<S: ChannelSet> {
    state: Arc<Mutex<SwitchState>>,
    handle: SchedulerHandle<S>,
    default_interval: f64,
}

impl<S: ChannelSet> Clone for ActionSwitchControl<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            handle: self.handle.clone(),
            default_interval: self.default_interval,
        }
    }
}

impl<S: ChannelSet> ActionSwitchControl<S> {
    /// Schedule a switch to `source`.
    ///
    /// The switch lands on the absolute tick `now + interval / dt`, with
    /// `interval` defaulting to `SwitchIntervalTime`. A later request replaces
    /// a pending one. Unblocks output. Returns false for an unknown source or
    /// a non-finite interval.
    pub fn switch_to(&self, source: &str, interval: Option<f64>) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.names.iter().position(|n| *n == source) else {
            log::error!("ActionSwitchWorker: action '{}' not found", source);
            return false;
        };

        let seconds = interval.unwrap_or(self.default_interval);
        if !seconds.is_finite() {
            log::error!(
                "ActionSwitchWorker: switch interval {} for '{}' is not a finite number of seconds",
                seconds,
                source
            );
            return false;
        }

        state.blocked = false;
        if state.active == Some(index) {
            state.pending = None;
            return true;
        }

        // `as` saturates, so absurdly long intervals park the switch at u64::MAX
        let delay = (seconds.max(0.0) / self.handle.dt()).round() as u64;
        let due = self.handle.timestamp().saturating_add(delay);
        state.pending = Some((index, due));
        log::info!("ActionSwitchWorker: switching to '{}' at tick {}", source, due);
        true
    }

    /// Stop writing the output channel until the next `switch_to`
    pub fn block_output(&self) {
        let mut state = self.state.lock();
        state.blocked = true;
        state.pending = None;
    }

    pub fn is_blocked(&self) -> bool {
        self.state.lock().blocked
    }

    /// Name of the source currently forwarded
    pub fn active(&self) -> Option<&'static str> {
        let state = self.state.lock();
        state.active.map(|i| state.names[i])
    }

    /// Pending source and the tick it becomes active
    pub fn pending(&self) -> Option<(&'static str, u64)> {
        let state = self.state.lock();
        state.pending.map(|(i, due)| (state.names[i], due))
    }
}

/// Action Switch Worker - selects one of several policy outputs
///
/// Every source is a channel with the same value type as `Out`. Each cycle
/// the active source is read and written to `Out` (or handed to a per-source
/// remap function). Output starts blocked; nothing is forwarded until the
/// first switch becomes due.
pub struct ActionSwitchWorker<S: ChannelSet, Out: Channel<Set = S>> {
    handle: SchedulerHandle<S>,
    sources: Vec<Source<S, Out::Value>>,
    control: ActionSwitchControl<S>,
}

impl<S: ChannelSet, Out: Channel<Set = S>> ActionSwitchWorker<S, Out> {
    pub fn new(handle: SchedulerHandle<S>, default_interval: f64) -> Self {
        let state = Arc::new(Mutex::new(SwitchState {
            blocked: true,
            ..SwitchState::default()
        }));
        let control = ActionSwitchControl {
            state,
            handle: handle.clone(),
            default_interval,
        };
        Self {
            handle,
            sources: Vec::new(),
            control,
        }
    }

    /// Register a selectable source channel
    pub fn add_source<C: Channel<Set = S, Value = Out::Value>>(mut self) -> Self {
        self.sources.push(Source {
            name: C::NAME,
            read: read_channel::<C>,
            remap: None,
        });
        self.control.state.lock().names.push(C::NAME);
        self
    }

    /// Replace the default "write to `Out`" step for one source
    pub fn set_remap<C, F>(&mut self, remap: F) -> CtrlzResult<()>
    where
        C: Channel<Set = S, Value = Out::Value>,
        F: FnMut(&SchedulerHandle<S>, Out::Value) + Send + 'static,
    {
        let source = self
            .sources
            .iter_mut()
            .find(|s| s.name == C::NAME)
            .ok_or_else(|| CtrlzError::ChannelNotFound(C::NAME.to_string()))?;
        source.remap = Some(Box::new(remap));
        Ok(())
    }

    pub fn control(&self) -> ActionSwitchControl<S> {
        self.control.clone()
    }

    pub fn switch_to(&self, source: &str, interval: Option<f64>) -> bool {
        self.control.switch_to(source, interval)
    }

    pub fn block_output(&self) {
        self.control.block_output()
    }

    /// Resolve which source to forward on `tick`, applying a due switch
    fn select(&self, tick: u64) -> Option<usize> {
        let mut state = self.control.state.lock();
        if state.blocked {
            return None;
        }
        if let Some((index, due)) = state.pending {
            if tick >= due {
                state.active = Some(index);
                state.pending = None;
                log::info!("ActionSwitchWorker: now forwarding '{}'", state.names[index]);
            }
        }
        state.active
    }
}

impl<S: ChannelSet, Out: Channel<Set = S>> FromConfig<S> for ActionSwitchWorker<S, Out> {
    fn from_config(handle: SchedulerHandle<S>, config: &serde_json::Value) -> CtrlzResult<Self> {
        let cfg: ActionSwitchConfig = if config.is_null() {
            ActionSwitchConfig {
                switch_interval_time: default_interval(),
            }
        } else {
            serde_json::from_value(config.clone())?
        };
        if !cfg.switch_interval_time.is_finite() || cfg.switch_interval_time < 0.0 {
            return Err(CtrlzError::config(format!(
                "SwitchIntervalTime must be >= 0, got {}",
                cfg.switch_interval_time
            )));
        }
        Ok(Self::new(handle, cfg.switch_interval_time))
    }
}

impl<S: ChannelSet, Out: Channel<Set = S>> Worker for ActionSwitchWorker<S, Out> {
    fn name(&self) -> &str {
        "ActionSwitchWorker"
    }

    fn run(&mut self, cycle: &CycleInfo<'_>) {
        let Some(index) = self.select(cycle.tick) else {
            return;
        };
        let source = &mut self.sources[index];
        let (value, _) = (source.read)(&self.handle);
        match source.remap.as_mut() {
            Some(remap) => remap(&self.handle, value),
            None => self.handle.set_data::<Out>(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctrlz_core::{channels, Scheduler, SchedulerConfig};
    use serde_json::json;

    channels! {
        Bus {
            WalkAction: [f32; 2],
            DanceAction: [f32; 2],
            TargetMotorPosition: [f32; 2],
            Unrelated: [f32; 2],
        }
    }

    type Switch = ActionSwitchWorker<Bus, TargetMotorPosition>;

    fn setup() -> (Scheduler<Bus>, ActionSwitchControl<Bus>) {
        let mut sched = Scheduler::<Bus>::new(SchedulerConfig::simulation(0.01)).unwrap();
        sched.create_task_list("main", 1, true).unwrap();

        let worker = sched
            .create_worker::<Switch>(&json!({"SwitchIntervalTime": 0.05}))
            .unwrap()
            .add_source::<WalkAction>()
            .add_source::<DanceAction>();
        let control = worker.control();
        sched.add_worker("main", worker).unwrap();
        sched.start().unwrap();

        sched.set_data::<WalkAction>([1.0, 1.0]);
        sched.set_data::<DanceAction>([2.0, 2.0]);
        (sched, control)
    }

    #[test]
    fn test_blocked_until_first_switch() {
        let (mut sched, control) = setup();
        assert!(control.is_blocked());
        sched.spin_once().unwrap();
        assert_eq!(sched.get_data::<TargetMotorPosition>(), ([0.0, 0.0], 0));
        sched.stop();
    }

    #[test]
    fn test_delayed_switch_lands_on_absolute_tick() {
        let (mut sched, control) = setup();

        assert!(control.switch_to("WalkAction", Some(0.0)));
        assert_eq!(sched.spin_once().unwrap(), 1);
        assert_eq!(control.active(), Some("WalkAction"));
        assert_eq!(sched.get_data::<TargetMotorPosition>(), ([1.0, 1.0], 1));

        // Default interval 0.05s at dt 0.01 -> 5 ticks after tick 1
        assert!(control.switch_to("DanceAction", None));
        assert_eq!(control.pending(), Some(("DanceAction", 6)));

        for _ in 2..6 {
            sched.spin_once().unwrap();
            assert_eq!(sched.get_data::<TargetMotorPosition>().0, [1.0, 1.0]);
        }
        assert_eq!(sched.spin_once().unwrap(), 6);
        assert_eq!(sched.get_data::<TargetMotorPosition>(), ([2.0, 2.0], 6));
        assert_eq!(control.pending(), None);
        sched.stop();
    }

    #[test]
    fn test_huge_and_non_finite_intervals() {
        let (mut sched, control) = setup();
        sched.spin_once().unwrap();

        assert!(control.switch_to("DanceAction", Some(1e18)));
        assert_eq!(control.pending(), Some(("DanceAction", u64::MAX)));
        sched.spin_once().unwrap();
        assert_eq!(control.active(), None);

        control.block_output();
        assert!(!control.switch_to("WalkAction", Some(f64::INFINITY)));
        assert!(!control.switch_to("WalkAction", Some(f64::NAN)));
        assert!(control.is_blocked());
        assert_eq!(control.pending(), None);
        sched.stop();
    }

    #[test]
    fn test_unknown_source_and_block() {
        let (mut sched, control) = setup();
        assert!(!control.switch_to("JumpAction", None));
        assert!(control.is_blocked());

        control.switch_to("WalkAction", Some(0.0));
        sched.spin_once().unwrap();
        control.block_output();
        sched.set_data::<WalkAction>([9.0, 9.0]);
        sched.spin_once().unwrap();
        sched.spin_once().unwrap();

        // Last forwarded value stays, stamped at the tick it was written
        assert_eq!(sched.get_data::<TargetMotorPosition>(), ([1.0, 1.0], 1));
        sched.stop();
    }

    #[test]
    fn test_custom_remap() {
        let mut sched = Scheduler::<Bus>::new(SchedulerConfig::simulation(0.01)).unwrap();
        sched.create_task_list("main", 1, true).unwrap();

        let mut worker = Switch::new(sched.handle(), 0.0).add_source::<DanceAction>();
        worker
            .set_remap::<DanceAction, _>(|h: &SchedulerHandle<Bus>, v: [f32; 2]| {
                h.set_data::<Unrelated>([-v[0], -v[1]]);
            })
            .unwrap();
        assert!(worker
            .set_remap::<WalkAction, _>(|_: &SchedulerHandle<Bus>, _: [f32; 2]| {})
            .is_err());

        worker.switch_to("DanceAction", None);
        sched.add_worker("main", worker).unwrap();
        sched.start().unwrap();

        sched.set_data::<DanceAction>([3.0, 4.0]);
        sched.spin_once().unwrap();
        assert_eq!(sched.get_data::<Unrelated>(), ([-3.0, -4.0], 1));
        assert_eq!(sched.get_data::<TargetMotorPosition>().1, 0);
        sched.stop();
    }

    #[test]
    fn test_rejects_negative_interval() {
        let sched = Scheduler::<Bus>::new(SchedulerConfig::simulation(0.01)).unwrap();
        assert!(sched
            .create_worker::<Switch>(&json!({"SwitchIntervalTime": -1.0}))
            .is_err());
        assert!(sched.create_worker::<Switch>(&serde_json::Value::Null).is_ok());
    }
}
