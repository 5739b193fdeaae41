//! luar - host values for an embedded scripting language
//!
//! Converts reflected host values ([`HostValue`]) into script values and
//! back. Primitives cross by value; functions become script callables;
//! channels, maps, slices, structs and pointers become opaque handles whose
//! operators (index, newindex, len, call, tostring, eq) act on the host
//! value.
//!
//! # Architecture
//!
//! ```text
//! convert ─► kind::classify ─┬─► primitive
//!                            ├─► adapter ──────────► script Function
//!                            └─► Handle + OperatorTable (chan/map/ptr/slice/struct/type)
//!                                        │
//!                     State dispatch ◄───┘ proxies ─► to_host / convert
//! ```
//!
//! # Example
//!
//! ```ignore
//! use luar::{convert, sdk::HostFunc, State};
//!
//! let state = State::new();
//! let greet = HostFunc::wrap(|name: String, age: u32| format!("Hello {}, age {}", name, age));
//! state.set_global("greet", convert(&state, greet.into())?);
//! let out = state.call(&state.global("greet"), vec!["Tim".into(), 5.0.into()])?;
//! assert_eq!(out[0].as_str(), Some("Hello Tim, age 5"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod registry;
pub mod script;

mod adapter;
mod convert;
mod kind;
mod primitive;
mod proxy;
mod reverse;

pub use config::{BridgeConfig, ConfigError, UnsupportedPolicy, DEFAULT_REGISTRY_KEY};
pub use convert::{convert, type_constructor, type_constructor_for};
pub use error::{BridgeError, BridgeResult, ErrorCategory};
pub use registry::{Operator, OperatorTable, OperatorTables, ProxyKind};
pub use reverse::to_host;
pub use script::{Function, Handle, ScriptValue, State, StateId, StateRef, Table};

/// The reflected host value model
pub use luar_sdk as sdk;
pub use luar_sdk::{HostFunc, HostType, HostValue};
