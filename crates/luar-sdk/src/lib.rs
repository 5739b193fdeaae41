//! luar SDK - reflected host values
//!
//! Rust has no runtime reflection over arbitrary types, so host code that
//! wants to hand values to scripts describes them with this crate instead:
//!
//! - [`HostType`] is the type descriptor the bridge dispatches on
//! - [`HostValue`] is a reflected value carrying enough type information to
//!   be classified, proxied and rebuilt from script values
//! - [`MapRef`], [`SliceRef`], [`PtrRef`] and [`ChanRef`] are shared
//!   references, [`StructValue`] is copied by value
//! - [`HostFunc`] is a host function of arbitrary signature
//!
//! # Example
//!
//! ```ignore
//! use luar_sdk::{HostFunc, HostType, HostValue, SliceRef};
//!
//! let letters = SliceRef::from_values(
//!     HostType::STRING,
//!     vec!["a".into(), "e".into(), "i".into()],
//! )?;
//! let greet = HostFunc::wrap(|name: String, age: u32| format!("Hello {name}, age {age}"));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod channel;
pub mod convert;
pub mod error;
pub mod func;
pub mod types;
pub mod value;

pub use channel::{ChanRef, Channel, ChannelError};
pub use convert::{FromHost, IntoResults, Reflect, ToHost};
pub use error::{HostError, HostResult};
pub use func::{HostFunc, IntoHostFunc};
pub use types::{
    ChanDir, Field, FloatWidth, FuncType, HostType, IntWidth, Kind, Method, Receiver, StructType,
    StructTypeBuilder,
};
pub use value::{grow_capacity, HostValue, MapKey, MapRef, Opaque, PtrRef, SliceRef, StructValue};
