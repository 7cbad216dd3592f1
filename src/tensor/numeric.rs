pub use num::{Float, One, Zero};
use std::cmp::PartialEq;

pub use std::ops::{Add, AddAssign, Mul, Sub};

pub trait Numeric:
    Add<Output = Self>
    + AddAssign
    + Copy
    + Clone
    + One
    + Mul<Output = Self>
    + Sub<Output = Self>
    + PartialEq
    + Zero
    + std::fmt::Debug
{
}

/// Scalars the network does calculus with.
pub trait Element: Numeric + Float + Send + Sync + 'static {
    fn from_f64(value: f64) -> Self;
    fn as_f64(self) -> f64;
}

// https://stackoverflow.com/questions/42381185/specifying-generic-parameter-to-belong-to-a-small-set-of-types
macro_rules! numeric_impl {
    ($($t: ty),+) => {
        $(
            impl Numeric for $t {}
        )+
    }
}

macro_rules! element_impl {
    ($($t: ty),+) => {
        $(
            impl Element for $t {
                #[inline]
                fn from_f64(value: f64) -> Self {
                    value as $t
                }

                #[inline]
                fn as_f64(self) -> f64 {
                    self as f64
                }
            }
        )+
    }
}

numeric_impl!(usize, u8, u32, u64, u128, i8, i32, i64, i128, f32, f64);
element_impl!(f32, f64);
