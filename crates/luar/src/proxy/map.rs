//! Map proxy
//!
//! Indexing reads and writes the shared host map. Calling the handle returns
//! an iterator over a snapshot of the keys:
//!
//! ```text
//! for k, v in places() do ... end
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};

use luar_sdk::{HostValue, MapRef};

use crate::convert::convert;
use crate::error::BridgeResult;
use crate::registry::{bad_operand, Operator, Proxy};
use crate::reverse::to_host;
use crate::script::{Function, Handle, ScriptValue, State};

pub(crate) struct MapProxy;

fn map_of(handle: &Handle, op: Operator) -> BridgeResult<&MapRef> {
    match handle.value() {
        Some(HostValue::Map(map)) => Ok(map),
        _ => Err(bad_operand(op, handle)),
    }
}

impl Proxy for MapProxy {
    fn index(&self, state: &State, handle: &Handle, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let map = map_of(handle, Operator::Index)?;
        let key = to_host(key, map.key_type())?;
        match map.get(&key)? {
            Some(value) => convert(state, value),
            None => Ok(ScriptValue::Nil),
        }
    }

    fn new_index(
        &self,
        _state: &State,
        handle: &Handle,
        key: &ScriptValue,
        value: &ScriptValue,
    ) -> BridgeResult<()> {
        let map = map_of(handle, Operator::NewIndex)?;
        let key = to_host(key, map.key_type())?;
        // nil stores the element type's zero value
        let value = to_host(value, map.elem_type())?;
        map.insert(key, value)?;
        Ok(())
    }

    fn len(&self, _state: &State, handle: &Handle) -> BridgeResult<ScriptValue> {
        let map = map_of(handle, Operator::Len)?;
        Ok(ScriptValue::Number(map.len() as f64))
    }

    fn call(&self, _state: &State, handle: &Handle, _args: Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> {
        let map = map_of(handle, Operator::Call)?.clone();
        let keys = map.keys();
        let cursor = AtomicUsize::new(0);
        let next = Function::new("map iterator", move |state, _args| {
            let i = cursor.fetch_add(1, Ordering::Relaxed);
            let Some(key) = keys.get(i) else {
                return Ok(Vec::new());
            };
            let value = map.get(key)?.unwrap_or(HostValue::Nil);
            Ok(vec![convert(state, key.clone())?, convert(state, value)?])
        });
        Ok(vec![ScriptValue::Function(next)])
    }
}
