//! Struct proxy
//!
//! A struct handle holds a copy, so its fields are readable but not
//! assignable. Exported fields and methods resolve by name; unexported
//! fields are invisible. Pointer-receiver methods are only reachable
//! through a pointer handle.

use luar_sdk::{HostValue, PtrRef, Receiver, StructValue};

use crate::adapter;
use crate::convert::convert;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{bad_operand, Operator, Proxy};
use crate::reverse::to_host;
use crate::script::{Handle, ScriptValue, State};

pub(crate) struct StructProxy;

/// Field value or bound method named `name`; nil when neither exists.
///
/// `ptr` is the pointer the struct was reached through, if any. It only
/// widens the method set: a struct-typed field comes back as a copy either
/// way, so writes into it fail as non-addressable.
pub(crate) fn field_or_method(
    state: &State,
    value: &StructValue,
    name: &str,
    ptr: Option<&PtrRef>,
) -> BridgeResult<ScriptValue> {
    let ty = value.ty();
    if let Some((index, _)) = ty.exported_field(name) {
        let field = value.field_at(index).cloned().unwrap_or(HostValue::Nil);
        return convert(state, field);
    }

    let Some(method) = ty.method(name) else {
        return Ok(ScriptValue::Nil);
    };
    let receiver = match (method.receiver, ptr) {
        (Receiver::Value, _) => HostValue::Struct(value.clone()),
        (Receiver::Pointer, Some(ptr)) => HostValue::Ptr(ptr.clone()),
        (Receiver::Pointer, None) => return Ok(ScriptValue::Nil),
    };
    Ok(ScriptValue::Function(adapter::bind(name, method.func.clone(), receiver)))
}

/// Assign an exported field of an addressable struct
pub(crate) fn assign_field(target: &mut StructValue, name: &str, value: &ScriptValue) -> BridgeResult<()> {
    let (index, field) = target
        .ty()
        .exported_field(name)
        .ok_or_else(|| BridgeError::UnknownField {
            type_name: target.ty().name().to_string(),
            field: name.to_string(),
        })?;
    let value = to_host(value, &field.ty)?;
    target.set_field_at(index, value)?;
    Ok(())
}

pub(crate) fn field_name<'a>(key: &'a ScriptValue, type_name: &str) -> BridgeResult<&'a str> {
    key.as_str().ok_or_else(|| BridgeError::UnknownField {
        type_name: type_name.to_string(),
        field: format!("<{}>", key.type_name()),
    })
}

impl Proxy for StructProxy {
    fn index(&self, state: &State, handle: &Handle, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let value = match handle.value() {
            Some(HostValue::Struct(value)) => value,
            _ => return Err(bad_operand(Operator::Index, handle)),
        };
        match key.as_str() {
            Some(name) => field_or_method(state, value, name, None),
            None => Ok(ScriptValue::Nil),
        }
    }

    fn new_index(
        &self,
        _state: &State,
        handle: &Handle,
        key: &ScriptValue,
        _value: &ScriptValue,
    ) -> BridgeResult<()> {
        let ty = match handle.value() {
            Some(HostValue::Struct(value)) => value.ty(),
            _ => return Err(bad_operand(Operator::NewIndex, handle)),
        };
        let name = field_name(key, ty.name())?;
        if ty.exported_field(name).is_some() {
            Err(BridgeError::NotAddressable {
                type_name: ty.name().to_string(),
                field: name.to_string(),
            })
        } else {
            Err(BridgeError::UnknownField {
                type_name: ty.name().to_string(),
                field: name.to_string(),
            })
        }
    }
}
