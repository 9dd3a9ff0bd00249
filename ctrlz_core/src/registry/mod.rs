//! # Keyed type registry
//!
//! Binds a closed set of named channels to value types at compile time.
//!
//! Each channel is a zero-sized marker type implementing [`Channel`]; its
//! slot index, name and value type are associated constants, so a typed
//! access like `data.get_data::<CurrentMotorPosition>()` resolves to a direct
//! field access with no lookup. A [`ChannelSet`] groups the markers of one
//! scheduler instantiation and owns the storage layout.
//!
//! Sets are normally generated with the `channels!` macro:
//!
//! ```rust,ignore
//! use ctrlz_core::channels;
//!
//! channels! {
//!     pub RobotBus {
//!         CurrentMotorPosition: [f32; 6],
//!         TargetMotorTorque: [f32; 6],
//!         InferenceTime: f32,
//!     }
//! }
//! ```
//!
//! Names only known at runtime (operator tools, logger configuration) go
//! through [`ChannelIndex`], built once per data center.

mod value;

pub use value::ChannelValue;

use crate::data_center::Slot;
use crate::error::{CtrlzError, CtrlzResult};
use std::collections::HashMap;

/// Static description of one channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelDescriptor {
    /// Channel name, unique within its set
    pub name: &'static str,
    /// Storage slot index
    pub index: usize,
    /// Number of scalar elements after flattening
    pub dim: usize,
    /// Whether the value is a fixed-size array
    pub is_array: bool,
    /// Source spelling of the value type
    pub type_name: &'static str,
}

impl ChannelDescriptor {
    pub const fn new(
        name: &'static str,
        index: usize,
        dim: usize,
        is_array: bool,
        type_name: &'static str,
    ) -> Self {
        Self {
            name,
            index,
            dim,
            is_array,
            type_name,
        }
    }

    /// Column names used for tabular export.
    ///
    /// Scalars export under their bare name, arrays expand to
    /// `name[0]` .. `name[dim-1]`.
    pub fn column_names(&self) -> Vec<String> {
        if self.is_array {
            (0..self.dim).map(|i| format!("{}[{}]", self.name, i)).collect()
        } else {
            vec![self.name.to_string()]
        }
    }
}

/// A closed set of channels with its storage layout
pub trait ChannelSet: Send + Sync + 'static {
    /// One independently locked slot per channel
    type Storage: Send + Sync + 'static;

    /// Name of the set (for diagnostics)
    const NAME: &'static str;

    /// Descriptors ordered by slot index
    const DESCRIPTORS: &'static [ChannelDescriptor];

    /// Build storage with every slot default-valued and stamped 0
    fn new_storage() -> Self::Storage;

    /// Flatten the value at `index` into `out`, returning its timestamp.
    /// `None` when the index is out of range.
    fn export(storage: &Self::Storage, index: usize, out: &mut Vec<f64>) -> Option<u64>;

    /// Number of channels in the set
    fn len() -> usize {
        Self::DESCRIPTORS.len()
    }
}

/// A named, typed channel belonging to exactly one [`ChannelSet`]
pub trait Channel: 'static {
    type Set: ChannelSet;
    type Value: ChannelValue;

    const NAME: &'static str;
    const INDEX: usize;

    /// Borrow this channel's slot inside the set storage
    fn slot(storage: &<Self::Set as ChannelSet>::Storage) -> &Slot<Self::Value>;

    /// Descriptor of this channel
    fn descriptor() -> &'static ChannelDescriptor {
        &<Self::Set as ChannelSet>::DESCRIPTORS[Self::INDEX]
    }
}

/// Name to slot index map, built once and never mutated afterwards
#[derive(Debug, Clone)]
pub struct ChannelIndex {
    by_name: HashMap<&'static str, usize>,
}

impl ChannelIndex {
    /// Build the index for a channel set
    pub fn of<S: ChannelSet>() -> Self {
        Self::from_descriptors(S::DESCRIPTORS)
    }

    pub fn from_descriptors(descriptors: &'static [ChannelDescriptor]) -> Self {
        let by_name = descriptors.iter().map(|d| (d.name, d.index)).collect();
        Self { by_name }
    }

    /// Resolve a runtime name to its slot index
    pub fn index_of(&self, name: &str) -> CtrlzResult<usize> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CtrlzError::ChannelNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
