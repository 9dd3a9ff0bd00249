//! Value types that can live in a channel

/// A value storable in a data center slot.
///
/// Implemented for the primitive numbers, `bool`, and fixed-size arrays of
/// any channel value, so vectors (`[f32; 3]`) and small matrices
/// (`[[f32; 3]; 3]`) are channel values too.
pub trait ChannelValue: Clone + Send + 'static {
    /// Number of scalar elements after flattening
    const DIM: usize;

    /// Whether the value is an array
    const IS_ARRAY: bool;

    /// Value a slot holds before its first write
    fn initial() -> Self;

    /// Append the flattened value to `out`
    fn export(&self, out: &mut Vec<f64>);
}

macro_rules! impl_scalar_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ChannelValue for $ty {
                const DIM: usize = 1;
                const IS_ARRAY: bool = false;

                #[inline]
                fn initial() -> Self {
                    <$ty>::default()
                }

                #[inline]
                fn export(&self, out: &mut Vec<f64>) {
                    out.push(*self as f64);
                }
            }
        )*
    };
}

impl_scalar_value!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize, f32, f64);

impl ChannelValue for bool {
    const DIM: usize = 1;
    const IS_ARRAY: bool = false;

    fn initial() -> Self {
        false
    }

    fn export(&self, out: &mut Vec<f64>) {
        out.push(if *self { 1.0 } else { 0.0 });
    }
}

impl<T: ChannelValue, const N: usize> ChannelValue for [T; N] {
    const DIM: usize = N * T::DIM;
    const IS_ARRAY: bool = true;

    fn initial() -> Self {
        std::array::from_fn(|_| T::initial())
    }

    fn export(&self, out: &mut Vec<f64>) {
        for item in self.iter() {
            item.export(out);
        }
    }
}
