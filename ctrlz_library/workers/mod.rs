//! Standard workers

pub mod action_switch;
pub mod callback;
pub mod csv_logger;
pub mod motor_pd;
pub mod motor_reset;

pub use action_switch::{ActionSwitchConfig, ActionSwitchControl, ActionSwitchWorker};
pub use callback::CallbackWorker;
pub use csv_logger::{CsvLoggerConfig, CsvLoggerWorker};
pub use motor_pd::{MotorPdChannels, MotorPdConfig, MotorPdWorker};
pub use motor_reset::{MotorResetConfig, MotorResetControl, MotorResetWorker};
