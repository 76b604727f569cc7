//! Tagged number: an `i32` or an `f32`, chosen by the value itself.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Wire tag of an [`InteropNumber`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i8)]
pub enum NumberTag {
    Int32 = 102,
    Float32 = 103,
}

/// A managed `number` narrowed to the smallest exact native representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteropNumber {
    Int32(i32),
    Float32(f32),
}

impl InteropNumber {
    /// Integral values that fit in `i32` stay integers; everything else becomes `f32`.
    pub fn from_f64(value: f64) -> Self {
        let truncated = value as i32;
        if f64::from(truncated) == value {
            InteropNumber::Int32(truncated)
        } else {
            InteropNumber::Float32(value as f32)
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            InteropNumber::Int32(v) => f64::from(v),
            InteropNumber::Float32(v) => f64::from(v),
        }
    }

    pub fn tag(self) -> NumberTag {
        match self {
            InteropNumber::Int32(_) => NumberTag::Int32,
            InteropNumber::Float32(_) => NumberTag::Float32,
        }
    }
}

impl Default for InteropNumber {
    fn default() -> Self {
        InteropNumber::Int32(0)
    }
}
