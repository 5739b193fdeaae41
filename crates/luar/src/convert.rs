//! Forward conversion entry points
//!
//! # Conversion table
//!
//! ```text
//! host kind                     script value
//! nil                           nil
//! bool                          boolean
//! int*, uint*, float*           number
//! string                        string
//! func                          function (adapter)
//! chan, map, ptr, slice, struct userdata with operator table
//! unsafe.Pointer, opaque        userdata without operator table
//! complex                       error, or inert userdata under the inert policy
//! ```

use luar_sdk::{HostType, HostValue};
use tracing::{trace, warn};

use crate::adapter;
use crate::config::UnsupportedPolicy;
use crate::error::{BridgeError, BridgeResult};
use crate::kind::{classify, Conversion};
use crate::registry::ProxyKind;
use crate::script::{Handle, Payload, ScriptValue, State};

/// Convert a host value into a script value
pub fn convert(state: &State, value: HostValue) -> BridgeResult<ScriptValue> {
    match classify(value) {
        Conversion::Nil => Ok(ScriptValue::Nil),
        Conversion::Passthrough(script) | Conversion::Primitive(script) => Ok(script),
        Conversion::Function(func) => Ok(ScriptValue::Function(adapter::wrap(func))),
        Conversion::Proxied(kind, value) => {
            let table = state.operator_tables()?.get(kind).clone();
            trace!(kind = %kind, ty = %value.type_name(), "proxying host value");
            Ok(ScriptValue::UserData(Handle::new(Payload::Value(value), Some(table))))
        }
        Conversion::Type(ty) => type_constructor_for(state, ty),
        Conversion::Inert(value) => Ok(inert(value)),
        Conversion::Unsupported(value) => match state.config().unsupported {
            UnsupportedPolicy::Fatal => Err(BridgeError::Unsupported {
                type_name: value.type_name(),
            }),
            UnsupportedPolicy::Inert => {
                warn!(ty = %value.type_name(), "passing unsupported host value through as inert handle");
                Ok(inert(value))
            }
        },
    }
}

fn inert(value: HostValue) -> ScriptValue {
    ScriptValue::UserData(Handle::new(Payload::Value(value), None))
}

/// Script callable that instantiates values of `example`'s type
pub fn type_constructor(state: &State, example: &HostValue) -> BridgeResult<ScriptValue> {
    type_constructor_for(state, example.host_type())
}

/// Script callable that instantiates values of `ty`
pub fn type_constructor_for(state: &State, ty: HostType) -> BridgeResult<ScriptValue> {
    let table = state.operator_tables()?.get(ProxyKind::Type).clone();
    Ok(ScriptValue::UserData(Handle::new(Payload::Type(ty), Some(table))))
}

/// Script values cross back into host code as opaque values
impl From<ScriptValue> for HostValue {
    fn from(value: ScriptValue) -> Self {
        HostValue::opaque(value)
    }
}
