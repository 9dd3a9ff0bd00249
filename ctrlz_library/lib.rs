//! # CTRL-Z Standard Library
//!
//! Reusable workers for CTRL-Z control loops.
//!
//! ## Structure
//!
//! ```text
//! ctrlz_library/
//! ── workers/
//!    ── callback/       # Closure-driven worker
//!    ── motor_pd/       # Joint-space PD torque law
//!    ── motor_reset/    # Linear move to a reset pose
//!    ── action_switch/  # Select one of several policy outputs
//!    ── csv_logger/     # Asynchronous CSV recorder
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ctrlz_library::{CsvLoggerWorker, MotorPdWorker};
//!
//! scheduler.spawn_worker::<MotorPdWorker<ArmBus, 6>>("main", &cfg["Workers"]["MotorPDLoop"])?;
//! scheduler.spawn_worker::<CsvLoggerWorker<ArmBus>>("main", &cfg["Workers"]["AsyncLogger"])?;
//! ```

pub mod workers;

pub use workers::{
    ActionSwitchConfig, ActionSwitchControl, ActionSwitchWorker, CallbackWorker, CsvLoggerConfig,
    CsvLoggerWorker, MotorPdChannels, MotorPdConfig, MotorPdWorker, MotorResetConfig,
    MotorResetControl, MotorResetWorker,
};
