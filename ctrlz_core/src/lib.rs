//! # CTRL-Z Core
//!
//! The core runtime of the CTRL-Z robot control framework.
//!
//! A fixed set of periodic workers (sensor readers, filters, control laws,
//! policies, loggers) runs at several rates derived from one master tick and
//! exchanges time-stamped, strongly typed values through a data center.
//!
//! - **Registry**: compile-time channel sets generated by `channels!`
//! - **Data Center**: one lock per channel, values stamped with the tick
//! - **Workers**: `create` / `cycle_begin` / `run` / `cycle_end` / `destroy`
//! - **Scheduling**: main task inline, secondary tasks on their own threads
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ctrlz_core::{channels, CycleInfo, Scheduler, SchedulerConfig, SchedulerHandle, Worker};
//!
//! channels! {
//!     pub Bus {
//!         JointPosition: [f32; 6],
//!     }
//! }
//!
//! struct Reader {
//!     handle: SchedulerHandle<Bus>,
//! }
//!
//! impl Worker for Reader {
//!     fn run(&mut self, _cycle: &CycleInfo<'_>) {
//!         self.handle.set_data::<JointPosition>([0.0; 6]);
//!     }
//! }
//!
//! let mut scheduler = Scheduler::<Bus>::new(SchedulerConfig::standard())?;
//! scheduler.create_task_list("main", 1, true)?;
//! scheduler.add_worker("main", Reader { handle: scheduler.handle() })?;
//! scheduler.start()?;
//! scheduler.spin()?;
//! ```

// Lets `channels!` expand to `::ctrlz_core::...` inside this crate too
extern crate self as ctrlz_core;

pub mod data_center;
pub mod error;
pub mod registry;
pub mod scheduling;
pub mod task;
pub mod worker;

pub use data_center::{DataCenter, Entry, Slot};
pub use error::{CtrlzError, CtrlzResult};
pub use registry::{Channel, ChannelDescriptor, ChannelIndex, ChannelSet, ChannelValue};
pub use scheduling::{Scheduler, SchedulerConfig, SchedulerHandle, SchedulerStats, TaskRealtime};
pub use task::{TaskInfo, TaskStats};
pub use worker::{CycleInfo, FromConfig, Worker};

#[cfg(feature = "macros")]
pub use ctrlz_macros::channels;
