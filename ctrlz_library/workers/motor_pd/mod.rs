use ctrlz_core::error::{CtrlzError, CtrlzResult};
use ctrlz_core::{Channel, ChannelSet, CycleInfo, FromConfig, SchedulerHandle, Worker};
use serde::{Deserialize, Serialize};

/// Binds the five joint-space channels a PD loop reads and writes
///
/// ```rust,ignore
/// impl MotorPdChannels<6> for ArmBus {
///     type TargetPosition = TargetMotorPosition;
///     type TargetVelocity = TargetMotorVelocity;
///     type CurrentPosition = CurrentMotorPosition;
///     type CurrentVelocity = CurrentMotorVelocity;
///     type TargetTorque = TargetMotorTorque;
/// }
/// ```
pub trait MotorPdChannels<const N: usize>: ChannelSet {
    type TargetPosition: Channel<Set = Self, Value = [f32; N]>;
    type TargetVelocity: Channel<Set = Self, Value = [f32; N]>;
    type CurrentPosition: Channel<Set = Self, Value = [f32; N]>;
    type CurrentVelocity: Channel<Set = Self, Value = [f32; N]>;
    type TargetTorque: Channel<Set = Self, Value = [f32; N]>;
}

/// PD gains, one per joint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorPdConfig {
    #[serde(rename = "Kp")]
    pub kp: Vec<f32>,
    #[serde(rename = "Kd")]
    pub kd: Vec<f32>,
}

/// Motor PD Worker - joint-space PD torque law
///
/// Each cycle computes `τ = Kp∘(q* − q) + Kd∘(q̇* − q̇)` from the target and
/// measured joint states and writes it to the target torque channel.
pub struct MotorPdWorker<B: MotorPdChannels<N>, const N: usize> {
    handle: SchedulerHandle<B>,
    kp: [f32; N],
    kd: [f32; N],
}

impl<B: MotorPdChannels<N>, const N: usize> MotorPdWorker<B, N> {
    pub fn new(handle: SchedulerHandle<B>, kp: [f32; N], kd: [f32; N]) -> Self {
        Self { handle, kp, kd }
    }

    pub fn gains(&self) -> (&[f32; N], &[f32; N]) {
        (&self.kp, &self.kd)
    }

    pub fn set_gains(&mut self, kp: [f32; N], kd: [f32; N]) {
        self.kp = kp;
        self.kd = kd;
    }

    /// Torque for one set of joint states
    pub fn torque(
        &self,
        target_pos: &[f32; N],
        target_vel: &[f32; N],
        current_pos: &[f32; N],
        current_vel: &[f32; N],
    ) -> [f32; N] {
        std::array::from_fn(|i| {
            self.kp[i] * (target_pos[i] - current_pos[i])
                + self.kd[i] * (target_vel[i] - current_vel[i])
        })
    }
}

pub(crate) fn to_joint_array<const N: usize>(name: &str, values: &[f32]) -> CtrlzResult<[f32; N]> {
    values.try_into().map_err(|_| {
        CtrlzError::config(format!(
            "{} has {} entries but the arm has {} joints",
            name,
            values.len(),
            N
        ))
    })
}

impl<B: MotorPdChannels<N>, const N: usize> FromConfig<B> for MotorPdWorker<B, N> {
    fn from_config(handle: SchedulerHandle<B>, config: &serde_json::Value) -> CtrlzResult<Self> {
        let cfg: MotorPdConfig = serde_json::from_value(config.clone())?;
        let kp = to_joint_array::<N>("Kp", &cfg.kp)?;
        let kd = to_joint_array::<N>("Kd", &cfg.kd)?;

        log::info!("MotorPdWorker: Kp={:?} Kd={:?}", kp, kd);
        Ok(Self::new(handle, kp, kd))
    }
}

impl<B: MotorPdChannels<N>, const N: usize> Worker for MotorPdWorker<B, N> {
    fn name(&self) -> &str {
        "MotorPdWorker"
    }

    fn run(&mut self, _cycle: &CycleInfo<'_>) {
        let (target_pos, _) = self.handle.get_data::<B::TargetPosition>();
        let (target_vel, _) = self.handle.get_data::<B::TargetVelocity>();
        let (current_pos, _) = self.handle.get_data::<B::CurrentPosition>();
        let (current_vel, _) = self.handle.get_data::<B::CurrentVelocity>();

        let torque = self.torque(&target_pos, &target_vel, &current_pos, &current_vel);
        self.handle.set_data::<B::TargetTorque>(torque);
    }
}
