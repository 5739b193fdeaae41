//! Type constructor proxy
//!
//! Calling a type handle makes a fresh value of the reified type:
//!
//! ```text
//! p = Person()     -- pointer to a zero Person
//! m = StringMap()  -- empty map
//! ```

use luar_sdk::{ChanRef, HostType, HostValue, PtrRef, SliceRef};

use crate::convert::convert;
use crate::error::BridgeResult;
use crate::registry::{bad_operand, Operator, Proxy};
use crate::script::{Handle, ScriptValue, State};

pub(crate) struct TypeProxy;

/// Capacity of slices made by a constructor call
const NEW_SLICE_CAPACITY: usize = 10;

/// Fresh instance of `ty`: made for maps, slices and channels, otherwise a
/// pointer to a new zero value
fn instantiate(ty: &HostType) -> HostValue {
    match ty {
        HostType::Map(..) => ty.zero_value(),
        HostType::Slice(elem) => HostValue::Slice(SliceRef::with_capacity(
            (**elem).clone(),
            0,
            NEW_SLICE_CAPACITY,
        )),
        HostType::Chan(dir, elem) => HostValue::Chan(ChanRef::new((**elem).clone(), 0).restrict(*dir)),
        other => HostValue::Ptr(PtrRef::with_type(other.clone(), other.zero_value())),
    }
}

impl Proxy for TypeProxy {
    fn call(&self, state: &State, handle: &Handle, _args: Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> {
        let ty = handle
            .reified_type()
            .ok_or_else(|| bad_operand(Operator::Call, handle))?;
        Ok(vec![convert(state, instantiate(ty))?])
    }

    fn to_string(&self, handle: &Handle) -> String {
        match handle.reified_type() {
            Some(ty) => format!("userdata: luar: type {}", ty),
            None => crate::registry::base_to_string(handle),
        }
    }
}
