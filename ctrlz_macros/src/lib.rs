//! # CTRL-Z Macros
//!
//! Procedural macros for the CTRL-Z robot control framework.
//!
//! ## Available Macros
//!
//! - `channels!` - Declare a closed, typed channel set for a data center

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod channels;

/// Declare a channel set: the fixed universe of named, typed values a
/// scheduler's data center stores.
///
/// # Example
///
/// ```rust,ignore
/// use ctrlz_core::channels;
///
/// channels! {
///     /// Channels of a six-joint arm
///     pub ArmBus {
///         /// Measured joint angles
///         CurrentMotorPosition: [f32; 6],
///         TargetMotorPosition: [f32; 6],
///         TargetMotorTorque: [f32; 6],
///         InferenceTime: f32,
///     }
/// }
///
/// let data = ctrlz_core::DataCenter::<ArmBus>::new();
/// data.set_data::<InferenceTime>(1, 0.004);
/// ```
///
/// # Generated Code
///
/// - `ArmBus`: zero-sized set type implementing `ChannelSet`
/// - one zero-sized marker per channel implementing `Channel`, with the
///   slot index (declaration order) as `Channel::INDEX`
/// - a hidden storage struct with one independently locked `Slot` per channel
///
/// Value types must implement `ChannelValue` (numbers, `bool`, and nested
/// fixed-size arrays of those). Duplicate channel names and empty sets are
/// compile errors.
#[proc_macro]
pub fn channels(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as channels::ChannelSetInput);
    channels::generate_channel_set(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
