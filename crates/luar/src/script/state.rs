//! Interpreter state
//!
//! A [`State`] is one interpreter instance. It owns the configuration, a
//! keyed registry for per-instance data (the operator tables live there),
//! the globals, and the operator dispatch every handle goes through.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::debug;

use super::handle::Handle;
use super::value::{format_number, Function, ScriptValue};
use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{Operator, OperatorTable, OperatorTables};

/// Unique identifier for a State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(u64);

impl StateId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        StateId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct StateInner {
    id: StateId,
    config: BridgeConfig,
    registry: Mutex<FxHashMap<String, Arc<dyn Any + Send + Sync>>>,
    globals: Mutex<FxHashMap<String, ScriptValue>>,
}

/// An interpreter instance
#[derive(Clone)]
pub struct State(Arc<StateInner>);

/// Non-owning reference to a [`State`], the form scripts hold.
///
/// A state can store itself in its own globals without keeping itself alive.
#[derive(Clone)]
pub struct StateRef(Weak<StateInner>);

impl StateRef {
    /// The state, unless it has been dropped
    pub fn upgrade(&self) -> Option<State> {
        self.0.upgrade().map(State)
    }

    /// Whether both refer to the same state
    pub fn ptr_eq(&self, other: &StateRef) -> bool {
        self.0.ptr_eq(&other.0)
    }

    /// Address of the state
    pub fn addr(&self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for StateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(state) => write!(f, "StateRef({})", state.id().as_u64()),
            None => f.write_str("StateRef(dropped)"),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}

impl State {
    /// State with the default configuration
    pub fn new() -> Self {
        Self::with_config(BridgeConfig::default())
    }

    /// State with an explicit configuration
    pub fn with_config(config: BridgeConfig) -> Self {
        State(Arc::new(StateInner {
            id: StateId::next(),
            config,
            registry: Mutex::new(FxHashMap::default()),
            globals: Mutex::new(FxHashMap::default()),
        }))
    }

    /// Unique ID
    pub fn id(&self) -> StateId {
        self.0.id
    }

    /// Non-owning reference for storing in script values
    pub fn downgrade(&self) -> StateRef {
        StateRef(Arc::downgrade(&self.0))
    }

    /// Configuration
    pub fn config(&self) -> &BridgeConfig {
        &self.0.config
    }

    // ========================================================================
    // Registry
    // ========================================================================

    /// Registry entry under `key`, created with `init` on first use.
    ///
    /// Fails if the slot already holds a value of another type.
    pub fn registry_get_or_insert_with<T, F>(&self, key: &str, init: F) -> BridgeResult<Arc<T>>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut registry = self.0.registry.lock();
        let entry = registry
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(init()) as Arc<dyn Any + Send + Sync>)
            .clone();
        entry.downcast::<T>().map_err(|_| BridgeError::RegistryCollision {
            key: key.to_string(),
        })
    }

    /// Registry entry under `key`, if present and of type `T`
    pub fn registry_get<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        let entry = self.0.registry.lock().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    /// Store a raw registry entry, replacing any previous one
    pub fn registry_set<T: Any + Send + Sync>(&self, key: &str, value: T) {
        self.0
            .registry
            .lock()
            .insert(key.to_string(), Arc::new(value));
    }

    /// The operator tables of this state, built on first use
    pub fn operator_tables(&self) -> BridgeResult<Arc<OperatorTables>> {
        let key = &self.0.config.registry_key;
        self.registry_get_or_insert_with(key, || {
            debug!(state = self.0.id.as_u64(), key = %key, "building operator tables");
            OperatorTables::build()
        })
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Bind a global
    pub fn set_global(&self, name: impl Into<String>, value: ScriptValue) {
        self.0.globals.lock().insert(name.into(), value);
    }

    /// Read a global; nil when unbound
    pub fn global(&self, name: &str) -> ScriptValue {
        self.0
            .globals
            .lock()
            .get(name)
            .cloned()
            .unwrap_or(ScriptValue::Nil)
    }

    /// Bind a host-backed callable as a global
    pub fn register_function(&self, name: impl Into<String>, function: Function) {
        self.set_global(name, ScriptValue::Function(function));
    }

    // ========================================================================
    // Operator dispatch
    // ========================================================================

    fn operand<'a>(
        &self,
        target: &'a ScriptValue,
        op: Operator,
    ) -> BridgeResult<(&'a Handle, &'a OperatorTable)> {
        match target {
            ScriptValue::UserData(handle) => match handle.table() {
                Some(table) if table.supports(op) => Ok((handle, table.as_ref())),
                _ => Err(BridgeError::BadOperand {
                    op: op.name(),
                    type_name: handle.type_name(),
                }),
            },
            other => Err(BridgeError::BadOperand {
                op: op.name(),
                type_name: other.type_name().to_string(),
            }),
        }
    }

    /// `target[key]`
    pub fn index(&self, target: &ScriptValue, key: &ScriptValue) -> BridgeResult<ScriptValue> {
        if let ScriptValue::Table(table) = target {
            return Ok(table.get(key));
        }
        let (handle, table) = self.operand(target, Operator::Index)?;
        table.proxy().index(self, handle, key)
    }

    /// `target[key] = value`
    pub fn set_index(&self, target: &ScriptValue, key: ScriptValue, value: ScriptValue) -> BridgeResult<()> {
        if let ScriptValue::Table(table) = target {
            return table.set(key, value);
        }
        let (handle, table) = self.operand(target, Operator::NewIndex)?;
        table.proxy().new_index(self, handle, &key, &value)
    }

    /// `#target`
    pub fn len(&self, target: &ScriptValue) -> BridgeResult<ScriptValue> {
        match target {
            ScriptValue::String(s) => Ok(ScriptValue::Number(s.len() as f64)),
            ScriptValue::Table(table) => Ok(ScriptValue::Number(table.len() as f64)),
            _ => {
                let (handle, table) = self.operand(target, Operator::Len)?;
                table.proxy().len(self, handle)
            }
        }
    }

    /// `target(args...)`
    pub fn call(&self, target: &ScriptValue, args: Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> {
        if let ScriptValue::Function(function) = target {
            return function.call(self, args);
        }
        let (handle, table) = self.operand(target, Operator::Call)?;
        table.proxy().call(self, handle, args)
    }

    /// `target:name(args...)`: look up `name`, then call it with `target`
    /// prepended
    pub fn call_method(
        &self,
        target: &ScriptValue,
        name: &str,
        args: Vec<ScriptValue>,
    ) -> BridgeResult<Vec<ScriptValue>> {
        let method = self.index(target, &ScriptValue::String(name.to_string()))?;
        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(target.clone());
        full.extend(args);
        self.call(&method, full)
    }

    /// `tostring(value)`
    pub fn to_string(&self, value: &ScriptValue) -> BridgeResult<String> {
        Ok(match value {
            ScriptValue::Nil => "nil".to_string(),
            ScriptValue::Bool(b) => b.to_string(),
            ScriptValue::Number(n) => format_number(*n),
            ScriptValue::String(s) => s.clone(),
            ScriptValue::Function(f) => format!("function: {:#x}", f.addr()),
            ScriptValue::Table(t) => format!("table: {:#x}", t.addr()),
            ScriptValue::State(s) => format!("thread: {:#x}", s.addr()),
            ScriptValue::UserData(handle) => match handle.table() {
                Some(table) if table.supports(Operator::ToString) => table.proxy().to_string(handle),
                _ => format!("userdata: {:#x}", handle.addr()),
            },
        })
    }

    /// `a == b`: raw equality, then the `eq` operator when both handles
    /// share a table that intercepts it
    pub fn equals(&self, a: &ScriptValue, b: &ScriptValue) -> bool {
        if a.raw_equal(b) {
            return true;
        }
        match (a, b) {
            (ScriptValue::UserData(x), ScriptValue::UserData(y)) => match (x.table(), y.table()) {
                (Some(tx), Some(ty)) if Arc::ptr_eq(tx, ty) && tx.supports(Operator::Eq) => {
                    tx.proxy().eq(x, y)
                }
                _ => false,
            },
            _ => false,
        }
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("State")
            .field("id", &self.0.id)
            .field("config", &self.0.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_ids_unique() {
        assert_ne!(State::new().id(), State::new().id());
    }

    #[test]
    fn test_registry_slot_is_typed() {
        let state = State::new();
        let first = state.registry_get_or_insert_with("counter", || 1u32).unwrap();
        let again = state.registry_get_or_insert_with("counter", || 2u32).unwrap();
        assert_eq!(*again, 1);
        assert!(Arc::ptr_eq(&first, &again));
        assert!(matches!(
            state.registry_get_or_insert_with("counter", || "text"),
            Err(BridgeError::RegistryCollision { .. })
        ));
    }

    #[test]
    fn test_operator_tables_cached() {
        let state = State::new();
        let a = state.operator_tables().unwrap();
        let b = state.operator_tables().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &State::new().operator_tables().unwrap()));
    }

    #[test]
    fn test_foreign_value_under_table_key() {
        let state = State::new();
        let key = state.config().registry_key.clone();
        state.registry_set(&key, 7u8);
        assert!(matches!(
            state.operator_tables(),
            Err(BridgeError::RegistryCollision { .. })
        ));
    }

    #[test]
    fn test_globals_and_tables() {
        let state = State::new();
        let echo = Function::new("echo", |_, args| Ok(args));
        state.register_function("echo", echo);
        let out = state
            .call(&state.global("echo"), vec![ScriptValue::from("hi")])
            .unwrap();
        assert_eq!(out, vec![ScriptValue::from("hi")]);
        assert!(state.global("missing").is_nil());
        assert_eq!(state.to_string(&ScriptValue::Number(3.0)).unwrap(), "3");
    }

    #[test]
    fn test_self_reference_does_not_leak() {
        let state = State::new();
        state.set_global("self", ScriptValue::from(&state));
        let handle = state.global("self");
        let weak = match &handle {
            ScriptValue::State(r) => r.clone(),
            other => panic!("expected state, got {:?}", other),
        };
        assert_eq!(weak.upgrade().map(|s| s.id()), Some(state.id()));

        drop(handle);
        drop(state);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_bad_operand() {
        let state = State::new();
        assert!(matches!(
            state.index(&ScriptValue::Number(1.0), &"x".into()),
            Err(BridgeError::BadOperand { op: "__index", .. })
        ));
    }
}
