//! # CTRL-Z Scheduling
//!
//! Multi-rate scheduling off one master clock:
//!
//! - **Main task**: runs inline on the thread calling `spin_once()`, every tick
//! - **Secondary tasks**: one thread each, released every `divisor` ticks
//! - **Three phases**: `cycle_begin` for all workers, then `run`, then `cycle_end`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ctrlz_core::{Scheduler, SchedulerConfig};
//!
//! let mut scheduler = Scheduler::<RobotBus>::new(SchedulerConfig::standard())?;
//! scheduler.create_task_list("main", 1, true)?;     // every tick
//! scheduler.create_task_list("policy", 10, false)?; // every 10th tick
//! scheduler.add_worker("main", motor_reader)?;
//! scheduler.add_worker("policy", inference)?;
//! scheduler.enable_task_list("policy");
//! scheduler.start()?;
//! scheduler.spin()?;
//! ```
//!
//! A task that is still busy when its next pulse arrives gets an overrun
//! warning; nothing is preempted.

pub mod config;
mod frequency;
mod handle;
mod realtime;
pub mod scheduler;

pub use config::SchedulerConfig;
pub use handle::{SchedulerHandle, SchedulerStats};
pub use realtime::TaskRealtime;
pub use scheduler::Scheduler;
