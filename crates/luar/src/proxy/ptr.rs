//! Pointer proxy
//!
//! Index operations go to the pointee. A struct pointee is addressable, so
//! field writes land in the shared cell and pointer-receiver methods are
//! visible. Map and slice pointees delegate both ways, channel pointees
//! only for reads.

use luar_sdk::{HostType, HostValue, PtrRef};

use super::structs::{assign_field, field_name, field_or_method};
use crate::convert::convert;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{bad_operand, Operator, Proxy};
use crate::script::{Handle, ScriptValue, State};

pub(crate) struct PtrProxy;

fn ptr_of(handle: &Handle, op: Operator) -> BridgeResult<&PtrRef> {
    match handle.value() {
        Some(HostValue::Ptr(ptr)) if ptr.is_nil() => Err(BridgeError::NilDereference),
        Some(HostValue::Ptr(ptr)) => Ok(ptr),
        _ => Err(bad_operand(op, handle)),
    }
}

fn unsupported_pointee(ptr: &PtrRef) -> BridgeError {
    BridgeError::mismatch(
        "pointer to struct, map, slice or chan",
        HostType::ptr(ptr.elem_type().clone()),
    )
}

impl Proxy for PtrProxy {
    fn index(&self, state: &State, handle: &Handle, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let ptr = ptr_of(handle, Operator::Index)?;
        match ptr.load()? {
            HostValue::Struct(value) => match key.as_str() {
                Some(name) => field_or_method(state, &value, name, Some(ptr)),
                None => Ok(ScriptValue::Nil),
            },
            target @ (HostValue::Map(_) | HostValue::Slice(_) | HostValue::Chan(_)) => {
                let inner = convert(state, target)?;
                state.index(&inner, key)
            }
            _ => Err(unsupported_pointee(ptr)),
        }
    }

    fn new_index(
        &self,
        state: &State,
        handle: &Handle,
        key: &ScriptValue,
        value: &ScriptValue,
    ) -> BridgeResult<()> {
        let ptr = ptr_of(handle, Operator::NewIndex)?;
        match ptr.elem_type() {
            HostType::Struct(ty) => {
                let name = field_name(key, ty.name())?;
                ptr.with(|cell| match cell {
                    HostValue::Struct(target) => assign_field(target, name, value),
                    _ => Err(unsupported_pointee(ptr)),
                })?
            }
            HostType::Map(..) | HostType::Slice(_) => {
                let inner = convert(state, ptr.load()?)?;
                state.set_index(&inner, key.clone(), value.clone())
            }
            _ => Err(unsupported_pointee(ptr)),
        }
    }
}
