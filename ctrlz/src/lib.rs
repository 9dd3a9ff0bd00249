//! # CTRL-Z - multi-rate robot control
//!
//! Umbrella crate bundling the runtime, the `channels!` macro and the
//! standard workers.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctrlz::prelude::*;
//!
//! channels! {
//!     pub ArmBus {
//!         TargetMotorPosition: [f32; 6],
//!         TargetMotorVelocity: [f32; 6],
//!         CurrentMotorPosition: [f32; 6],
//!         CurrentMotorVelocity: [f32; 6],
//!         TargetMotorTorque: [f32; 6],
//!     }
//! }
//!
//! impl MotorPdChannels<6> for ArmBus {
//!     type TargetPosition = TargetMotorPosition;
//!     type TargetVelocity = TargetMotorVelocity;
//!     type CurrentPosition = CurrentMotorPosition;
//!     type CurrentVelocity = CurrentMotorVelocity;
//!     type TargetTorque = TargetMotorTorque;
//! }
//!
//! fn main() -> AnyResult<()> {
//!     let config = SchedulerConfig::from_file("scheduler.yaml")?;
//!     let mut scheduler = Scheduler::<ArmBus>::new(config)?;
//!     scheduler.create_task_list("main", 1, true)?;
//!     scheduler.spawn_worker::<MotorPdWorker<ArmBus, 6>>(
//!         "main",
//!         &serde_json::json!({"Kp": vec![40.0; 6], "Kd": vec![1.0; 6]}),
//!     )?;
//!     scheduler.start()?;
//!     scheduler.install_signal_handler();
//!     scheduler.spin()?;
//!     Ok(())
//! }
//! ```
//!
//! `channels!` expands to paths under `::ctrlz_core`, so a crate that declares
//! channel sets lists `ctrlz_core` among its dependencies next to `ctrlz`.

pub use ctrlz_core::{self, *};

pub use ctrlz_library as library;

pub use log;
pub use serde_json;

/// Everything a control application usually needs
pub mod prelude {
    // Registry and data center
    pub use ctrlz_core::{Channel, ChannelSet, ChannelValue, DataCenter};

    // Workers
    pub use ctrlz_core::{CycleInfo, FromConfig, TaskInfo, Worker};

    // Scheduling
    pub use ctrlz_core::{Scheduler, SchedulerConfig, SchedulerHandle, SchedulerStats, TaskStats};

    // Error types
    pub use ctrlz_core::error::{CtrlzError, CtrlzResult};
    pub type Result<T> = CtrlzResult<T>;

    #[cfg(feature = "macros")]
    pub use ctrlz_macros::channels;

    // Standard workers
    pub use ctrlz_library::{
        ActionSwitchControl, ActionSwitchWorker, CallbackWorker, CsvLoggerConfig,
        CsvLoggerWorker, MotorPdChannels, MotorPdConfig, MotorPdWorker, MotorResetControl,
        MotorResetWorker,
    };

    pub use std::time::Duration;

    // Common traits
    pub use serde::{Deserialize, Serialize};

    // Worker configs are JSON values
    pub use serde_json::json;

    // Re-export anyhow for error handling
    pub use anyhow::{anyhow, bail, ensure, Context, Result as AnyResult};
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn version() -> &'static str {
    VERSION
}
