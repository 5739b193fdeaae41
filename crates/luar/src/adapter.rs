//! Function adapter
//!
//! Wraps a [`HostFunc`] as a script [`Function`]. Arguments are rebuilt with
//! the declared parameter types as hints, results are forward converted in
//! declared order. Too few arguments is an arity error; surplus arguments to
//! a non-variadic function are ignored. A panic inside the host function
//! surfaces as a runtime error.

use std::panic::{self, AssertUnwindSafe};

use luar_sdk::{HostFunc, HostType, HostValue, SliceRef};

use crate::convert::convert;
use crate::error::{BridgeError, BridgeResult};
use crate::reverse::to_host;
use crate::script::{Function, ScriptValue, State};

/// Script callable for a free function
pub(crate) fn wrap(func: HostFunc) -> Function {
    let name = func.ty().to_string();
    Function::new(name, move |state, args| invoke(state, &func, None, args))
}

/// Script callable for a method with its receiver bound.
///
/// Called as `obj:method(...)`: the first argument is the `self` slot and is
/// discarded in favour of the bound receiver.
pub(crate) fn bind(name: &str, func: HostFunc, receiver: HostValue) -> Function {
    Function::new(name, move |state, mut args| {
        if !args.is_empty() {
            args.remove(0);
        }
        invoke(state, &func, Some(&receiver), args)
    })
}

fn invoke(
    state: &State,
    func: &HostFunc,
    receiver: Option<&HostValue>,
    args: Vec<ScriptValue>,
) -> BridgeResult<Vec<ScriptValue>> {
    let ty = func.ty();
    let bound = usize::from(receiver.is_some());
    let required = ty.required_params().saturating_sub(bound);
    if args.len() < required {
        return Err(BridgeError::Arity {
            function: ty.to_string(),
            expected: required,
            got: args.len(),
        });
    }

    let mut host_args = Vec::with_capacity(ty.params.len());
    host_args.extend(receiver.cloned());

    let mut args = args.into_iter();
    for param in ty.params.iter().take(ty.required_params()).skip(bound) {
        let arg = args.next().unwrap_or(ScriptValue::Nil);
        host_args.push(to_host(&arg, param)?);
    }

    if ty.variadic {
        let elem = match ty.params.last() {
            Some(HostType::Slice(elem)) => (**elem).clone(),
            _ => HostType::Interface,
        };
        let rest = args
            .map(|arg| to_host(&arg, &elem))
            .collect::<BridgeResult<Vec<_>>>()?;
        host_args.push(HostValue::Slice(SliceRef::from_values(elem, rest)?));
    }

    let results = panic::catch_unwind(AssertUnwindSafe(|| func.call(host_args)))
        .map_err(|panic| {
            let msg = if let Some(s) = panic.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "host function panicked".to_string()
            };
            BridgeError::Runtime(msg)
        })??;

    results.into_iter().map(|value| convert(state, value)).collect()
}
