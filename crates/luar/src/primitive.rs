//! Primitive conversions
//!
//! Booleans, numbers and strings cross the boundary by value. Every host
//! number becomes an `f64`; integers beyond 2^53 lose precision.

use luar_sdk::{FloatWidth, HostType, HostValue, IntWidth};

use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

/// Script form of a primitive host value; `None` for anything else
pub(crate) fn forward(value: &HostValue) -> Option<ScriptValue> {
    match value {
        HostValue::Bool(b) => Some(ScriptValue::Bool(*b)),
        HostValue::Int(_, i) => Some(ScriptValue::Number(*i as f64)),
        HostValue::Uint(_, u) => Some(ScriptValue::Number(*u as f64)),
        HostValue::Float(_, x) => Some(ScriptValue::Number(*x)),
        HostValue::String(s) => Some(ScriptValue::String(s.clone())),
        _ => None,
    }
}

fn wrap_int(i: i64, width: IntWidth) -> i64 {
    match width {
        IntWidth::W8 => i as i8 as i64,
        IntWidth::W16 => i as i16 as i64,
        IntWidth::W32 => i as i32 as i64,
        IntWidth::W64 => i,
        IntWidth::Size => i as isize as i64,
    }
}

fn wrap_uint(u: u64, width: IntWidth) -> u64 {
    match width {
        IntWidth::W8 => u as u8 as u64,
        IntWidth::W16 => u as u16 as u64,
        IntWidth::W32 => u as u32 as u64,
        IntWidth::W64 => u,
        IntWidth::Size => u as usize as u64,
    }
}

/// Coerce a script number to a numeric hint.
///
/// Fractions truncate toward zero and out-of-width values wrap.
/// An interface hint yields `float64`.
pub(crate) fn coerce_number(n: f64, hint: &HostType) -> BridgeResult<HostValue> {
    match hint {
        HostType::Int(width) => Ok(HostValue::Int(*width, wrap_int(n as i64, *width))),
        HostType::Uint(width) => {
            let bits = if n < 0.0 { n as i64 as u64 } else { n as u64 };
            Ok(HostValue::Uint(*width, wrap_uint(bits, *width)))
        }
        HostType::Float(FloatWidth::W32) => Ok(HostValue::Float(FloatWidth::W32, n as f32 as f64)),
        HostType::Float(FloatWidth::W64) | HostType::Interface => {
            Ok(HostValue::Float(FloatWidth::W64, n))
        }
        other => Err(BridgeError::mismatch(other, "number")),
    }
}
