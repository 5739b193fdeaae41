//! Reverse conversion: script value plus host type hint to host value

use luar_sdk::{HostType, HostValue};

use crate::error::{BridgeError, BridgeResult};
use crate::primitive;
use crate::script::{Payload, ScriptValue};

/// Rebuild a host value from a script value, guided by `hint`.
///
/// Handles unwrap to their payload whatever the hint; functions, tables
/// and states become opaque host values.
pub fn to_host(value: &ScriptValue, hint: &HostType) -> BridgeResult<HostValue> {
    // No wildcard arm: every script value kind needs an explicit rule
    match value {
        ScriptValue::Nil => Ok(hint.zero_value()),
        ScriptValue::Bool(b) => match hint {
            HostType::Bool | HostType::Interface => Ok(HostValue::Bool(*b)),
            other => Err(BridgeError::mismatch(other, "boolean")),
        },
        ScriptValue::Number(n) => primitive::coerce_number(*n, hint),
        ScriptValue::String(s) => match hint {
            HostType::String | HostType::Interface => Ok(HostValue::String(s.clone())),
            other => Err(BridgeError::mismatch(other, "string")),
        },
        ScriptValue::Function(_) | ScriptValue::Table(_) | ScriptValue::State(_) => {
            Ok(HostValue::opaque(value.clone()))
        }
        ScriptValue::UserData(handle) => Ok(match handle.payload() {
            Payload::Value(inner) => inner.clone(),
            Payload::Type(ty) => HostValue::opaque(ty.clone()),
        }),
    }
}
