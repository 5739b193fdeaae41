//! Slice proxy
//!
//! Scripts index slices from 1. `append` may reallocate, so it returns a
//! new handle the caller rebinds:
//!
//! ```text
//! letters = letters:append("o", "u")
//! print(letters:capacity())
//! ```

use luar_sdk::{HostValue, SliceRef};

use crate::convert::convert;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{bad_operand, Operator, Proxy};
use crate::reverse::to_host;
use crate::script::{Function, Handle, ScriptValue, State};

pub(crate) struct SliceProxy;

fn slice_of(handle: &Handle, op: Operator) -> BridgeResult<&SliceRef> {
    match handle.value() {
        Some(HostValue::Slice(slice)) => Ok(slice),
        _ => Err(bad_operand(op, handle)),
    }
}

/// Zero-based position for a 1-based script index
fn script_index(key: &ScriptValue, len: usize) -> BridgeResult<usize> {
    let n = match key {
        ScriptValue::Number(n) if n.fract() == 0.0 => *n,
        ScriptValue::Number(_) => return Err(BridgeError::mismatch("integer index", "number")),
        other => return Err(BridgeError::mismatch("integer index", other.type_name())),
    };
    let index = n as i64;
    if index < 1 || index as u64 > len as u64 {
        return Err(BridgeError::IndexOutOfRange { index, len });
    }
    Ok((index - 1) as usize)
}

fn append(slice: SliceRef) -> Function {
    Function::new("append", move |state, args| {
        let items = args
            .iter()
            .skip(1)
            .map(|item| to_host(item, slice.elem_type()))
            .collect::<BridgeResult<Vec<_>>>()?;
        let grown = slice.append(items)?;
        Ok(vec![convert(state, HostValue::Slice(grown))?])
    })
}

fn capacity(slice: SliceRef) -> Function {
    Function::new("capacity", move |_state, _args| {
        Ok(vec![ScriptValue::Number(slice.cap() as f64)])
    })
}

impl Proxy for SliceProxy {
    fn index(&self, state: &State, handle: &Handle, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let slice = slice_of(handle, Operator::Index)?;
        match key.as_str() {
            Some("append") => return Ok(ScriptValue::Function(append(slice.clone()))),
            Some("capacity") => return Ok(ScriptValue::Function(capacity(slice.clone()))),
            Some(_) => return Ok(ScriptValue::Nil),
            None => {}
        }
        let i = script_index(key, slice.len())?;
        let value = slice.get(i).ok_or(BridgeError::IndexOutOfRange {
            index: i as i64 + 1,
            len: slice.len(),
        })?;
        convert(state, value)
    }

    fn new_index(
        &self,
        _state: &State,
        handle: &Handle,
        key: &ScriptValue,
        value: &ScriptValue,
    ) -> BridgeResult<()> {
        let slice = slice_of(handle, Operator::NewIndex)?;
        let i = script_index(key, slice.len())?;
        slice.set(i, to_host(value, slice.elem_type())?)?;
        Ok(())
    }

    fn len(&self, _state: &State, handle: &Handle) -> BridgeResult<ScriptValue> {
        let slice = slice_of(handle, Operator::Len)?;
        Ok(ScriptValue::Number(slice.len() as f64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_index_bounds() {
        assert_eq!(script_index(&ScriptValue::Number(1.0), 3).unwrap(), 0);
        assert_eq!(script_index(&ScriptValue::Number(3.0), 3).unwrap(), 2);
        assert_eq!(
            script_index(&ScriptValue::Number(0.0), 3),
            Err(BridgeError::IndexOutOfRange { index: 0, len: 3 })
        );
        assert_eq!(
            script_index(&ScriptValue::Number(4.0), 3),
            Err(BridgeError::IndexOutOfRange { index: 4, len: 3 })
        );
        assert!(matches!(
            script_index(&ScriptValue::Number(1.5), 3),
            Err(BridgeError::TypeMismatch { .. })
        ));
    }
}
