//! Per-kind proxies behind the operator tables

mod channel;
mod map;
mod ptr;
mod slice;
mod structs;
mod ty;

pub(crate) use channel::ChanProxy;
pub(crate) use map::MapProxy;
pub(crate) use ptr::PtrProxy;
pub(crate) use slice::SliceProxy;
pub(crate) use structs::StructProxy;
pub(crate) use ty::TypeProxy;

use crate::error::{BridgeError, BridgeResult};
use crate::script::ScriptValue;

/// Argument `index` of a method call, where argument 0 is `self`
fn method_arg(
    function: &'static str,
    args: &[ScriptValue],
    index: usize,
) -> BridgeResult<ScriptValue> {
    args.get(index).cloned().ok_or(BridgeError::Arity {
        function: function.to_string(),
        expected: index,
        got: args.len().saturating_sub(1),
    })
}
