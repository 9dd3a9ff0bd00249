//! Time-stamped, per-slot locked storage for one channel set
//!
//! Every channel owns its own [`Slot`]; writers and readers of different
//! channels never touch the same lock. Timestamps are supplied by the caller
//! (normally the scheduler tick) and stored under the same guard as the
//! value, so a reader always observes a consistent `(value, timestamp)` pair.

use crate::error::{CtrlzError, CtrlzResult};
use crate::registry::{Channel, ChannelDescriptor, ChannelIndex, ChannelSet, ChannelValue};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;

/// Stored value plus the tick it was written on
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub timestamp: u64,
    pub value: T,
}

/// One independently locked storage cell
pub struct Slot<T> {
    entry: Mutex<Entry<T>>,
}

impl<T: ChannelValue> Slot<T> {
    /// Slot holding the type's initial value, stamped 0
    pub fn new() -> Self {
        Self {
            entry: Mutex::new(Entry {
                timestamp: 0,
                value: T::initial(),
            }),
        }
    }

    #[inline]
    pub fn store(&self, timestamp: u64, value: T) {
        let mut entry = self.entry.lock();
        entry.timestamp = timestamp;
        entry.value = value;
    }

    #[inline]
    pub fn load(&self) -> (T, u64) {
        let entry = self.entry.lock();
        (entry.value.clone(), entry.timestamp)
    }

    #[inline]
    pub fn timestamp(&self) -> u64 {
        self.entry.lock().timestamp
    }

    /// Flatten the stored value into `out` and return its timestamp
    pub fn export(&self, out: &mut Vec<f64>) -> u64 {
        let entry = self.entry.lock();
        entry.value.export(out);
        entry.timestamp
    }

    /// Hold the slot guard directly. Used by contention tests and tools that
    /// need to read several fields of a large value without copying.
    pub fn lock(&self) -> MutexGuard<'_, Entry<T>> {
        self.entry.lock()
    }
}

impl<T: ChannelValue> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe store for exactly the channels of `S`
pub struct DataCenter<S: ChannelSet> {
    storage: S::Storage,
    index: ChannelIndex,
}

impl<S: ChannelSet> DataCenter<S> {
    pub fn new() -> Self {
        Self {
            storage: S::new_storage(),
            index: ChannelIndex::of::<S>(),
        }
    }

    /// Overwrite the value and timestamp of channel `C`
    #[inline]
    pub fn set_data<C: Channel<Set = S>>(&self, timestamp: u64, value: C::Value) {
        C::slot(&self.storage).store(timestamp, value);
    }

    /// Copy out the value and timestamp of channel `C`
    #[inline]
    pub fn get_data<C: Channel<Set = S>>(&self) -> (C::Value, u64) {
        C::slot(&self.storage).load()
    }

    /// Timestamp of the last write to `C` (0 if never written)
    #[inline]
    pub fn timestamp_of<C: Channel<Set = S>>(&self) -> u64 {
        C::slot(&self.storage).timestamp()
    }

    /// Direct access to the slot of `C`
    pub fn slot<C: Channel<Set = S>>(&self) -> &Slot<C::Value> {
        C::slot(&self.storage)
    }

    /// Resolve a runtime channel name. Meant for setup time, not the hot path.
    pub fn index_of(&self, name: &str) -> CtrlzResult<usize> {
        self.index.index_of(name)
    }

    pub fn descriptor(&self, index: usize) -> Option<&'static ChannelDescriptor> {
        S::DESCRIPTORS.get(index)
    }

    pub fn descriptors(&self) -> &'static [ChannelDescriptor] {
        S::DESCRIPTORS
    }

    /// Flatten the channel at `index` into `out`, returning its timestamp
    pub fn export(&self, index: usize, out: &mut Vec<f64>) -> CtrlzResult<u64> {
        S::export(&self.storage, index, out).ok_or_else(|| {
            CtrlzError::ChannelNotFound(format!("#{} in {}", index, S::NAME))
        })
    }

    /// Flatten a channel looked up by name
    pub fn export_by_name(&self, name: &str, out: &mut Vec<f64>) -> CtrlzResult<u64> {
        let index = self.index_of(name)?;
        self.export(index, out)
    }
}

impl<S: ChannelSet> Default for DataCenter<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ChannelSet> fmt::Debug for DataCenter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataCenter")
            .field("set", &S::NAME)
            .field("channels", &S::DESCRIPTORS.len())
            .finish()
    }
}
