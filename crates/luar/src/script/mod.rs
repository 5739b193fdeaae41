//! Embedded-language surface
//!
//! The minimal interpreter model the bridge needs: a tagged value type,
//! host-backed functions, tables, opaque handles with operator tables, and
//! a per-instance [`State`] that dispatches operators.
//!
//! ```ignore
//! let state = State::new();
//! let places = luar::convert(&state, map.into())?;
//! state.set_global("places", places.clone());
//! let na = state.index(&places, &"NA".into())?;
//! ```

mod handle;
mod state;
mod value;

pub use handle::Handle;
pub(crate) use handle::Payload;
pub use state::{State, StateId, StateRef};
pub use value::{Function, ScriptValue, Table};
