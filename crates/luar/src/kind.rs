//! Kind classification
//!
//! Routes each host value to exactly one conversion strategy. The match is
//! exhaustive over [`HostValue`]; a new host variant must pick a strategy
//! here before anything compiles.

use luar_sdk::{HostFunc, HostType, HostValue};

use crate::primitive;
use crate::registry::ProxyKind;
use crate::script::ScriptValue;

/// Conversion strategy for one host value
#[derive(Debug)]
pub(crate) enum Conversion {
    /// Script nil
    Nil,
    /// Already a script value
    Passthrough(ScriptValue),
    /// Converted by value
    Primitive(ScriptValue),
    /// Wrapped by the function adapter
    Function(HostFunc),
    /// Handle with the table for the kind
    Proxied(ProxyKind, HostValue),
    /// Reified type carried back from a type handle
    Type(HostType),
    /// Handle with no table
    Inert(HostValue),
    /// No defined conversion
    Unsupported(HostValue),
}

pub(crate) fn classify(value: HostValue) -> Conversion {
    match value {
        HostValue::Nil => Conversion::Nil,
        HostValue::Bool(_)
        | HostValue::Int(..)
        | HostValue::Uint(..)
        | HostValue::Float(..)
        | HostValue::String(_) => match primitive::forward(&value) {
            Some(script) => Conversion::Primitive(script),
            None => Conversion::Unsupported(value),
        },
        HostValue::Complex(..) => Conversion::Unsupported(value),
        HostValue::Func(f) => Conversion::Function(f),
        HostValue::Chan(_) => Conversion::Proxied(ProxyKind::Chan, value),
        HostValue::Map(_) => Conversion::Proxied(ProxyKind::Map, value),
        HostValue::Slice(_) => Conversion::Proxied(ProxyKind::Slice, value),
        HostValue::Struct(_) => Conversion::Proxied(ProxyKind::Struct, value),
        HostValue::Ptr(_) => Conversion::Proxied(ProxyKind::Ptr, value),
        HostValue::UnsafePointer(_) => Conversion::Inert(value),
        HostValue::Opaque(ref opaque) => {
            if let Some(script) = opaque.downcast_ref::<ScriptValue>() {
                Conversion::Passthrough(script.clone())
            } else if let Some(ty) = opaque.downcast_ref::<HostType>() {
                Conversion::Type(ty.clone())
            } else {
                Conversion::Inert(value)
            }
        }
    }
}
