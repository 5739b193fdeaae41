//! Host functions
//!
//! A [`HostFunc`] is a signature plus a body over reflected values. Plain
//! Rust closures become host functions through [`IntoHostFunc`], which
//! derives the signature from the closure's argument and return types.

use std::fmt;
use std::sync::Arc;

use crate::convert::{FromHost, IntoResults, Reflect};
use crate::error::{HostError, HostResult};
use crate::types::{FuncType, HostType};
use crate::value::HostValue;

type Body = dyn Fn(Vec<HostValue>) -> HostResult<Vec<HostValue>> + Send + Sync;

/// A callable host function
#[derive(Clone)]
pub struct HostFunc {
    ty: Arc<FuncType>,
    body: Arc<Body>,
}

impl HostFunc {
    /// Create a function from an explicit signature and body.
    ///
    /// For variadic signatures the body receives the trailing arguments
    /// already packed into a slice in the last position.
    pub fn new<F>(ty: FuncType, body: F) -> Self
    where
        F: Fn(Vec<HostValue>) -> HostResult<Vec<HostValue>> + Send + Sync + 'static,
    {
        HostFunc {
            ty: Arc::new(ty),
            body: Arc::new(body),
        }
    }

    /// Create a function from a typed closure
    pub fn wrap<Args, F: IntoHostFunc<Args>>(f: F) -> Self {
        f.into_host_func()
    }

    /// Signature
    pub fn ty(&self) -> &FuncType {
        &self.ty
    }

    /// Function type of this value
    pub fn host_type(&self) -> HostType {
        HostType::Func(self.ty.clone())
    }

    /// Call with exactly one value per declared parameter
    pub fn call(&self, args: Vec<HostValue>) -> HostResult<Vec<HostValue>> {
        if args.len() != self.ty.params.len() {
            return Err(HostError::Arity {
                expected: self.ty.params.len(),
                got: args.len(),
            });
        }
        for (param, arg) in self.ty.params.iter().zip(&args) {
            if !param.is_assignable_from(arg) {
                return Err(HostError::mismatch(param, arg.type_name()));
            }
        }
        (self.body)(args)
    }

    /// Whether both share the same body
    pub fn ptr_eq(&self, other: &HostFunc) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }

    /// Address of the body
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.body) as *const () as usize
    }
}

impl fmt::Debug for HostFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostFunc({} @ {:#x})", self.ty, self.addr())
    }
}

/// Conversion of typed closures into [`HostFunc`]
pub trait IntoHostFunc<Args>: Send + Sync + 'static {
    /// Build the host function
    fn into_host_func(self) -> HostFunc;
}

macro_rules! impl_into_host_func {
    ($($ty:ident $arg:ident),*) => {
        impl<F, R, $($ty),*> IntoHostFunc<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoResults,
            $($ty: FromHost + Reflect,)*
        {
            #[allow(unused_mut, unused_variables)]
            fn into_host_func(self) -> HostFunc {
                let ty = FuncType::new(vec![$(<$ty as Reflect>::host_type()),*], R::result_types());
                HostFunc::new(ty, move |args| {
                    let mut args = args.into_iter();
                    $(
                        let $arg = <$ty as FromHost>::from_host(args.next().unwrap_or(HostValue::Nil))?;
                    )*
                    (self)($($arg),*).into_results()
                })
            }
        }
    };
}

impl_into_host_func!();
impl_into_host_func!(A a);
impl_into_host_func!(A a, B b);
impl_into_host_func!(A a, B b, C c);
impl_into_host_func!(A a, B b, C c, D d);
