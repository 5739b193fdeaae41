//! Script values
//!
//! The tagged value model of the embedded language: nil, booleans, numbers,
//! strings, functions, tables, opaque handles and the interpreter state
//! itself. Numbers are always `f64`.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::handle::Handle;
use super::state::{State, StateRef};
use crate::error::{BridgeError, BridgeResult};

type NativeFn = dyn Fn(&State, Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> + Send + Sync;

/// A value of the embedded language
#[derive(Debug, Clone)]
pub enum ScriptValue {
    /// `nil`
    Nil,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(String),
    /// Host-backed callable
    Function(Function),
    /// Table
    Table(Table),
    /// Opaque handle around a host value or type
    UserData(Handle),
    /// Interpreter state object, held weakly
    State(StateRef),
}

impl ScriptValue {
    /// Script-level type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Nil => "nil",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Function(_) => "function",
            ScriptValue::Table(_) => "table",
            ScriptValue::UserData(_) => "userdata",
            ScriptValue::State(_) => "thread",
        }
    }

    /// Whether this is `nil`
    pub fn is_nil(&self) -> bool {
        matches!(self, ScriptValue::Nil)
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Number payload
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// String payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Function payload
    pub fn as_function(&self) -> Option<&Function> {
        match self {
            ScriptValue::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Handle payload
    pub fn as_handle(&self) -> Option<&Handle> {
        match self {
            ScriptValue::UserData(h) => Some(h),
            _ => None,
        }
    }

    /// Equality without operator dispatch
    pub fn raw_equal(&self, other: &ScriptValue) -> bool {
        match (self, other) {
            (ScriptValue::Nil, ScriptValue::Nil) => true,
            (ScriptValue::Bool(a), ScriptValue::Bool(b)) => a == b,
            (ScriptValue::Number(a), ScriptValue::Number(b)) => a == b,
            (ScriptValue::String(a), ScriptValue::String(b)) => a == b,
            (ScriptValue::Function(a), ScriptValue::Function(b)) => a.ptr_eq(b),
            (ScriptValue::Table(a), ScriptValue::Table(b)) => a.ptr_eq(b),
            (ScriptValue::UserData(a), ScriptValue::UserData(b)) => a.ptr_eq(b),
            (ScriptValue::State(a), ScriptValue::State(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        self.raw_equal(other)
    }
}

/// Formats a number the way the script prints it: integral values without
/// a fractional part
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "nan".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<i64> for ScriptValue {
    fn from(n: i64) -> Self {
        ScriptValue::Number(n as f64)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(s.to_string())
    }
}

impl From<String> for ScriptValue {
    fn from(s: String) -> Self {
        ScriptValue::String(s)
    }
}

impl From<&State> for ScriptValue {
    fn from(state: &State) -> Self {
        ScriptValue::State(state.downgrade())
    }
}

impl From<Function> for ScriptValue {
    fn from(f: Function) -> Self {
        ScriptValue::Function(f)
    }
}

impl From<Table> for ScriptValue {
    fn from(t: Table) -> Self {
        ScriptValue::Table(t)
    }
}

impl From<Handle> for ScriptValue {
    fn from(h: Handle) -> Self {
        ScriptValue::UserData(h)
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Host-backed script callable
#[derive(Clone)]
pub struct Function {
    name: Arc<str>,
    f: Arc<NativeFn>,
}

impl Function {
    /// Create a callable
    pub fn new<F>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(&State, Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> + Send + Sync + 'static,
    {
        Function {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke with positional arguments
    pub fn call(&self, state: &State, args: Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> {
        (self.f)(state, args)
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Function) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    /// Address of the callable
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.f) as *const () as usize
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({} @ {:#x})", self.name, self.addr())
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Shared associative table with raw-equality keys
#[derive(Clone, Default)]
pub struct Table(Arc<Mutex<Vec<(ScriptValue, ScriptValue)>>>);

impl Table {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with values at keys `1..=n`
    pub fn from_sequence(values: impl IntoIterator<Item = ScriptValue>) -> Self {
        let entries = values
            .into_iter()
            .enumerate()
            .map(|(i, v)| (ScriptValue::Number((i + 1) as f64), v))
            .collect();
        Table(Arc::new(Mutex::new(entries)))
    }

    /// Value under `key`; nil when absent
    pub fn get(&self, key: &ScriptValue) -> ScriptValue {
        self.0
            .lock()
            .iter()
            .find(|(k, _)| k.raw_equal(key))
            .map(|(_, v)| v.clone())
            .unwrap_or(ScriptValue::Nil)
    }

    /// Store `value` under `key`; storing nil removes the entry
    pub fn set(&self, key: ScriptValue, value: ScriptValue) -> BridgeResult<()> {
        if key.is_nil() {
            return Err(BridgeError::mismatch("table key", "nil"));
        }
        let mut entries = self.0.lock();
        let existing = entries.iter().position(|(k, _)| k.raw_equal(&key));
        match (existing, value.is_nil()) {
            (Some(i), true) => {
                entries.remove(i);
            }
            (Some(i), false) => entries[i].1 = value,
            (None, true) => {}
            (None, false) => entries.push((key, value)),
        }
        Ok(())
    }

    /// Border of the sequence part: largest `n` with keys `1..=n` present
    pub fn len(&self) -> usize {
        let mut n = 0usize;
        while !self.get(&ScriptValue::Number((n + 1) as f64)).is_nil() {
            n += 1;
        }
        n
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Identity comparison
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the table
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({:#x})", self.addr())
    }
}
