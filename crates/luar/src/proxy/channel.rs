//! Channel proxy
//!
//! ```text
//! v, ok = ch:receive()
//! ch:send(v)
//! ch:close()
//! ```
//!
//! `receive` and `send` block the calling thread only.

use luar_sdk::{ChanRef, HostValue};
use tracing::trace;

use super::method_arg;
use crate::convert::convert;
use crate::error::BridgeResult;
use crate::registry::{bad_operand, Operator, Proxy};
use crate::reverse::to_host;
use crate::script::{Function, Handle, ScriptValue, State};

pub(crate) struct ChanProxy;

fn receive(ch: ChanRef) -> Function {
    Function::new("receive", move |state, _args| {
        trace!(chan = ch.addr(), "receive");
        match ch.receive()? {
            Some(value) => Ok(vec![convert(state, value)?, ScriptValue::Bool(true)]),
            None => Ok(vec![ScriptValue::Nil, ScriptValue::Bool(false)]),
        }
    })
}

fn send(ch: ChanRef) -> Function {
    Function::new("send", move |_state, args| {
        let value = to_host(&method_arg("send", &args, 1)?, ch.elem_type())?;
        trace!(chan = ch.addr(), "send");
        ch.send(value)?;
        Ok(Vec::new())
    })
}

fn close(ch: ChanRef) -> Function {
    Function::new("close", move |_state, _args| {
        ch.close()?;
        Ok(Vec::new())
    })
}

impl Proxy for ChanProxy {
    fn index(&self, _state: &State, handle: &Handle, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        let ch = match handle.value() {
            Some(HostValue::Chan(ch)) => ch.clone(),
            _ => return Err(bad_operand(Operator::Index, handle)),
        };
        let method = match key.as_str() {
            Some("receive") => receive(ch),
            Some("send") => send(ch),
            Some("close") => close(ch),
            _ => return Ok(ScriptValue::Nil),
        };
        Ok(ScriptValue::Function(method))
    }
}
