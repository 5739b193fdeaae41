//! Conversions between Rust types and reflected host values
//!
//! - [`Reflect`] names the host type a Rust type stands for
//! - [`ToHost`] / [`FromHost`] move values across
//! - [`IntoResults`] turns a closure's return value into a result list

use std::fmt;

use crate::error::{HostError, HostResult};
use crate::types::{FloatWidth, HostType, IntWidth};
use crate::value::{HostValue, SliceRef};

/// Rust types with a fixed host type
pub trait Reflect {
    /// Host type this Rust type corresponds to
    fn host_type() -> HostType;
}

/// Convert a Rust value into a host value
pub trait ToHost {
    /// Perform the conversion
    fn to_host(self) -> HostValue;
}

/// Extract a Rust value from a host value
pub trait FromHost: Sized {
    /// Perform the conversion
    fn from_host(value: HostValue) -> HostResult<Self>;
}

/// Return values of host functions
pub trait IntoResults {
    /// Declared result types
    fn result_types() -> Vec<HostType>;
    /// Convert into the result list
    fn into_results(self) -> HostResult<Vec<HostValue>>;
}

// ============================================================================
// Scalars
// ============================================================================

impl Reflect for bool {
    fn host_type() -> HostType {
        HostType::Bool
    }
}

impl ToHost for bool {
    fn to_host(self) -> HostValue {
        HostValue::Bool(self)
    }
}

impl FromHost for bool {
    fn from_host(value: HostValue) -> HostResult<Self> {
        match value {
            HostValue::Bool(b) => Ok(b),
            other => Err(HostError::mismatch("bool", other.type_name())),
        }
    }
}

macro_rules! impl_int {
    ($($ty:ty => $variant:ident($width:expr)),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn host_type() -> HostType {
                    HostType::$variant($width)
                }
            }

            impl ToHost for $ty {
                fn to_host(self) -> HostValue {
                    HostValue::from(self)
                }
            }

            impl FromHost for $ty {
                fn from_host(value: HostValue) -> HostResult<Self> {
                    let converted = match &value {
                        HostValue::Int(_, i) => <$ty>::try_from(*i).ok(),
                        HostValue::Uint(_, u) => <$ty>::try_from(*u).ok(),
                        _ => None,
                    };
                    converted.ok_or_else(|| {
                        HostError::mismatch(<$ty as Reflect>::host_type(), value.type_name())
                    })
                }
            }
        )*
    };
}

impl_int! {
    i8 => Int(IntWidth::W8),
    i16 => Int(IntWidth::W16),
    i32 => Int(IntWidth::W32),
    i64 => Int(IntWidth::W64),
    isize => Int(IntWidth::Size),
    u8 => Uint(IntWidth::W8),
    u16 => Uint(IntWidth::W16),
    u32 => Uint(IntWidth::W32),
    u64 => Uint(IntWidth::W64),
    usize => Uint(IntWidth::Size),
}

macro_rules! impl_float {
    ($($ty:ty => $width:expr),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn host_type() -> HostType {
                    HostType::Float($width)
                }
            }

            impl ToHost for $ty {
                fn to_host(self) -> HostValue {
                    HostValue::from(self)
                }
            }

            impl FromHost for $ty {
                fn from_host(value: HostValue) -> HostResult<Self> {
                    match value {
                        HostValue::Float(_, x) => Ok(x as $ty),
                        other => Err(HostError::mismatch(<$ty as Reflect>::host_type(), other.type_name())),
                    }
                }
            }
        )*
    };
}

impl_float! {
    f32 => FloatWidth::W32,
    f64 => FloatWidth::W64,
}

impl Reflect for String {
    fn host_type() -> HostType {
        HostType::String
    }
}

impl ToHost for String {
    fn to_host(self) -> HostValue {
        HostValue::String(self)
    }
}

impl ToHost for &str {
    fn to_host(self) -> HostValue {
        HostValue::String(self.to_string())
    }
}

impl FromHost for String {
    fn from_host(value: HostValue) -> HostResult<Self> {
        match value {
            HostValue::String(s) => Ok(s),
            other => Err(HostError::mismatch("string", other.type_name())),
        }
    }
}

// ============================================================================
// Dynamic values and slices
// ============================================================================

impl Reflect for HostValue {
    fn host_type() -> HostType {
        HostType::Interface
    }
}

impl ToHost for HostValue {
    fn to_host(self) -> HostValue {
        self
    }
}

impl FromHost for HostValue {
    fn from_host(value: HostValue) -> HostResult<Self> {
        Ok(value)
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn host_type() -> HostType {
        HostType::slice(T::host_type())
    }
}

impl<T: Reflect + ToHost> ToHost for Vec<T> {
    fn to_host(self) -> HostValue {
        let values = self.into_iter().map(ToHost::to_host).collect();
        match SliceRef::from_values(T::host_type(), values) {
            Ok(slice) => HostValue::Slice(slice),
            // Reflect and ToHost disagree; keep the values untyped
            Err(_) => HostValue::Nil,
        }
    }
}

impl<T: FromHost> FromHost for Vec<T> {
    fn from_host(value: HostValue) -> HostResult<Self> {
        match value {
            HostValue::Slice(slice) => slice.to_vec().into_iter().map(T::from_host).collect(),
            HostValue::Nil => Ok(Vec::new()),
            other => Err(HostError::mismatch("slice", other.type_name())),
        }
    }
}

// ============================================================================
// Results
// ============================================================================

impl<T: ToHost + Reflect> IntoResults for T {
    fn result_types() -> Vec<HostType> {
        vec![T::host_type()]
    }

    fn into_results(self) -> HostResult<Vec<HostValue>> {
        Ok(vec![self.to_host()])
    }
}

impl IntoResults for () {
    fn result_types() -> Vec<HostType> {
        Vec::new()
    }

    fn into_results(self) -> HostResult<Vec<HostValue>> {
        Ok(Vec::new())
    }
}

impl<A: ToHost + Reflect, B: ToHost + Reflect> IntoResults for (A, B) {
    fn result_types() -> Vec<HostType> {
        vec![A::host_type(), B::host_type()]
    }

    fn into_results(self) -> HostResult<Vec<HostValue>> {
        Ok(vec![self.0.to_host(), self.1.to_host()])
    }
}

impl<A: ToHost + Reflect, B: ToHost + Reflect, C: ToHost + Reflect> IntoResults for (A, B, C) {
    fn result_types() -> Vec<HostType> {
        vec![A::host_type(), B::host_type(), C::host_type()]
    }

    fn into_results(self) -> HostResult<Vec<HostValue>> {
        Ok(vec![self.0.to_host(), self.1.to_host(), self.2.to_host()])
    }
}

/// An `Err` is raised as a call error
impl<T: IntoResults, E: fmt::Display> IntoResults for Result<T, E> {
    fn result_types() -> Vec<HostType> {
        T::result_types()
    }

    fn into_results(self) -> HostResult<Vec<HostValue>> {
        match self {
            Ok(value) => value.into_results(),
            Err(e) => Err(HostError::Call(e.to_string())),
        }
    }
}
