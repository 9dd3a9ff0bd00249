use super::motor_pd::{to_joint_array, MotorPdChannels};
use ctrlz_core::error::{CtrlzError, CtrlzResult};
use ctrlz_core::{CycleInfo, FromConfig, SchedulerHandle, Worker};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Reset pose and how long the move towards it takes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorResetConfig {
    #[serde(rename = "ResetPosition")]
    pub reset_position: Vec<f32>,
    /// Seconds
    #[serde(rename = "ResetDuration")]
    pub reset_duration: f64,
}

#[derive(Debug, Clone, Copy)]
struct Ramp<const N: usize> {
    /// Tick on which the reset pose is reached
    due: u64,
    step: [f32; N],
}

/// Thread-safe remote for a [`MotorResetWorker`]
pub struct MotorResetControl<B: MotorPdChannels<N>, const N: usize> {
    ramp: Arc<Mutex<Option<Ramp<N>>>>,
    handle: SchedulerHandle<B>,
    reset_position: [f32; N],
    default_ticks: u64,
}

impl<B: MotorPdChannels<N>, const N: usize> Clone for MotorResetControl<B, N> {
    fn clone(&self) -> Self {
        Self {
            ramp: self.ramp.clone(),
            handle: self.handle.clone(),
            reset_position: self.reset_position,
            default_ticks: self.default_ticks,
        }
    }
}

impl<B: MotorPdChannels<N>, const N: usize> MotorResetControl<B, N> {
    /// Start moving from the current joint position to the reset pose.
    ///
    /// The move spans `duration` seconds (default `ResetDuration`), at least
    /// one tick. Restarting mid-move ramps from wherever the joints are now.
    /// Returns false for a negative or non-finite duration.
    pub fn start_reset(&self, duration: Option<f64>) -> bool {
        let ticks = match duration {
            None => self.default_ticks,
            Some(secs) if secs.is_finite() && secs >= 0.0 => {
                ((secs / self.handle.dt()).round() as u64).max(1)
            }
            Some(secs) => {
                log::error!("MotorResetWorker: invalid reset duration {}", secs);
                return false;
            }
        };

        let (current, _) = self.handle.get_data::<B::CurrentPosition>();
        let step = std::array::from_fn(|i| (self.reset_position[i] - current[i]) / ticks as f32);
        let due = self.handle.timestamp().saturating_add(ticks);
        *self.ramp.lock() = Some(Ramp { due, step });
        log::info!("MotorResetWorker: resetting over {} ticks, done at tick {}", ticks, due);
        true
    }

    /// Abandon the move, leaving the last written target in place
    pub fn stop_reset(&self) {
        *self.ramp.lock() = None;
    }

    pub fn is_resetting(&self) -> bool {
        self.ramp.lock().is_some()
    }
}

/// Motor Reset Worker - drives joints linearly to a reset pose
///
/// While a reset is active, each cycle writes the target position channel
/// with a point on the straight line from the joint position sampled at
/// `start_reset` to the reset pose. On the due tick the pose itself is
/// written and the worker goes idle.
pub struct MotorResetWorker<B: MotorPdChannels<N>, const N: usize> {
    handle: SchedulerHandle<B>,
    control: MotorResetControl<B, N>,
}

impl<B: MotorPdChannels<N>, const N: usize> MotorResetWorker<B, N> {
    pub fn new(handle: SchedulerHandle<B>, reset_position: [f32; N], duration: f64) -> Self {
        let default_ticks = ((duration.max(0.0) / handle.dt()).round() as u64).max(1);
        let control = MotorResetControl {
            ramp: Arc::new(Mutex::new(None)),
            handle: handle.clone(),
            reset_position,
            default_ticks,
        };
        Self { handle, control }
    }

    pub fn control(&self) -> MotorResetControl<B, N> {
        self.control.clone()
    }

    pub fn start_reset(&self, duration: Option<f64>) -> bool {
        self.control.start_reset(duration)
    }

    pub fn stop_reset(&self) {
        self.control.stop_reset()
    }

    /// Target for `tick`, or None when idle
    fn target(&self, tick: u64) -> Option<[f32; N]> {
        let mut ramp = self.control.ramp.lock();
        let Ramp { due, step } = (*ramp)?;
        let pose = &self.control.reset_position;
        if tick >= due {
            *ramp = None;
            log::info!("MotorResetWorker: reset pose reached");
            return Some(*pose);
        }
        let remaining = (due - tick) as f32;
        Some(std::array::from_fn(|i| pose[i] - step[i] * remaining))
    }
}

impl<B: MotorPdChannels<N>, const N: usize> FromConfig<B> for MotorResetWorker<B, N> {
    fn from_config(handle: SchedulerHandle<B>, config: &serde_json::Value) -> CtrlzResult<Self> {
        let cfg: MotorResetConfig = serde_json::from_value(config.clone())?;
        let pose = to_joint_array::<N>("ResetPosition", &cfg.reset_position)?;
        if !cfg.reset_duration.is_finite() || cfg.reset_duration <= 0.0 {
            return Err(CtrlzError::config(format!(
                "ResetDuration must be > 0, got {}",
                cfg.reset_duration
            )));
        }

        log::info!(
            "MotorResetWorker: ResetPosition={:?} ResetDuration={}s",
            pose,
            cfg.reset_duration
        );
        Ok(Self::new(handle, pose, cfg.reset_duration))
    }
}

impl<B: MotorPdChannels<N>, const N: usize> Worker for MotorResetWorker<B, N> {
    fn name(&self) -> &str {
        "MotorResetWorker"
    }

    fn run(&mut self, cycle: &CycleInfo<'_>) {
        if let Some(target) = self.target(cycle.tick) {
            self.handle.set_data::<B::TargetPosition>(target);
        }
    }
}
