//! Operator tables
//!
//! Every proxied handle carries one of six immutable tables, one per
//! [`ProxyKind`]. A table lists the operators scripts may apply to the handle
//! and the proxy implementing them. Tables are built once per
//! [`State`](crate::State) and cached in its registry.

use std::fmt;
use std::sync::Arc;

use crate::error::{BridgeError, BridgeResult};
use crate::proxy::{ChanProxy, MapProxy, PtrProxy, SliceProxy, StructProxy, TypeProxy};
use crate::script::{Handle, ScriptValue, State};

/// The six proxied kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyKind {
    /// Channels
    Chan,
    /// Maps
    Map,
    /// Pointers
    Ptr,
    /// Slices
    Slice,
    /// Structs
    Struct,
    /// Type constructors
    Type,
}

impl ProxyKind {
    /// All kinds, in table order
    pub const ALL: [ProxyKind; 6] = [
        ProxyKind::Chan,
        ProxyKind::Map,
        ProxyKind::Ptr,
        ProxyKind::Slice,
        ProxyKind::Struct,
        ProxyKind::Type,
    ];

    /// Table name
    pub fn name(self) -> &'static str {
        match self {
            ProxyKind::Chan => "chan",
            ProxyKind::Map => "map",
            ProxyKind::Ptr => "ptr",
            ProxyKind::Slice => "slice",
            ProxyKind::Struct => "struct",
            ProxyKind::Type => "type",
        }
    }

    fn operators(self) -> &'static [Operator] {
        const CHAN: &[Operator] = &[Operator::Index, Operator::ToString, Operator::Eq];
        const MAP: &[Operator] = &[
            Operator::Index,
            Operator::NewIndex,
            Operator::Len,
            Operator::Call,
            Operator::ToString,
            Operator::Eq,
        ];
        const PTR: &[Operator] = &[Operator::Index, Operator::NewIndex, Operator::ToString, Operator::Eq];
        const SLICE: &[Operator] = &[
            Operator::Index,
            Operator::NewIndex,
            Operator::Len,
            Operator::ToString,
            Operator::Eq,
        ];
        const STRUCT: &[Operator] = &[Operator::Index, Operator::NewIndex, Operator::ToString];
        const TYPE: &[Operator] = &[Operator::Call, Operator::ToString];

        match self {
            ProxyKind::Chan => CHAN,
            ProxyKind::Map => MAP,
            ProxyKind::Ptr => PTR,
            ProxyKind::Slice => SLICE,
            ProxyKind::Struct => STRUCT,
            ProxyKind::Type => TYPE,
        }
    }

    fn proxy(self) -> Box<dyn Proxy> {
        match self {
            ProxyKind::Chan => Box::new(ChanProxy),
            ProxyKind::Map => Box::new(MapProxy),
            ProxyKind::Ptr => Box::new(PtrProxy),
            ProxyKind::Slice => Box::new(SliceProxy),
            ProxyKind::Struct => Box::new(StructProxy),
            ProxyKind::Type => Box::new(TypeProxy),
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operators a handle can intercept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `h[k]`, `h.k`
    Index,
    /// `h[k] = v`
    NewIndex,
    /// `#h`
    Len,
    /// `h(...)`
    Call,
    /// `tostring(h)`
    ToString,
    /// `h == other`
    Eq,
}

impl Operator {
    /// Metamethod name
    pub fn name(self) -> &'static str {
        match self {
            Operator::Index => "__index",
            Operator::NewIndex => "__newindex",
            Operator::Len => "__len",
            Operator::Call => "__call",
            Operator::ToString => "__tostring",
            Operator::Eq => "__eq",
        }
    }
}

/// Behaviour behind an operator table.
///
/// Defaults reject the operator; the table's operator list decides which
/// methods dispatch ever reaches.
pub(crate) trait Proxy: Send + Sync {
    fn index(&self, _state: &State, handle: &Handle, _key: &ScriptValue) -> BridgeResult<ScriptValue> {
        Err(bad_operand(Operator::Index, handle))
    }

    fn new_index(
        &self,
        _state: &State,
        handle: &Handle,
        _key: &ScriptValue,
        _value: &ScriptValue,
    ) -> BridgeResult<()> {
        Err(bad_operand(Operator::NewIndex, handle))
    }

    fn len(&self, _state: &State, handle: &Handle) -> BridgeResult<ScriptValue> {
        Err(bad_operand(Operator::Len, handle))
    }

    fn call(&self, _state: &State, handle: &Handle, _args: Vec<ScriptValue>) -> BridgeResult<Vec<ScriptValue>> {
        Err(bad_operand(Operator::Call, handle))
    }

    fn to_string(&self, handle: &Handle) -> String {
        base_to_string(handle)
    }

    /// Host identity of the payloads
    fn eq(&self, a: &Handle, b: &Handle) -> bool {
        match (a.value(), b.value()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }
}

pub(crate) fn bad_operand(op: Operator, handle: &Handle) -> BridgeError {
    BridgeError::BadOperand {
        op: op.name(),
        type_name: handle.type_name(),
    }
}

/// `userdata: luar: <type> <value> (<address>)`
pub(crate) fn base_to_string(handle: &Handle) -> String {
    match handle.value() {
        Some(value) => format!(
            "userdata: luar: {} {} ({:#x})",
            value.type_name(),
            value,
            value.addr().unwrap_or_else(|| handle.addr())
        ),
        None => format!("userdata: luar: {} ({:#x})", handle.type_name(), handle.addr()),
    }
}

/// One immutable operator table
pub struct OperatorTable {
    kind: ProxyKind,
    operators: &'static [Operator],
    proxy: Box<dyn Proxy>,
}

impl OperatorTable {
    fn new(kind: ProxyKind) -> Self {
        OperatorTable {
            kind,
            operators: kind.operators(),
            proxy: kind.proxy(),
        }
    }

    /// Kind this table serves
    pub fn kind(&self) -> ProxyKind {
        self.kind
    }

    /// Intercepted operators
    pub fn operators(&self) -> &[Operator] {
        self.operators
    }

    /// Whether `op` is intercepted
    pub fn supports(&self, op: Operator) -> bool {
        self.operators.contains(&op)
    }

    pub(crate) fn proxy(&self) -> &dyn Proxy {
        self.proxy.as_ref()
    }
}

impl fmt::Debug for OperatorTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperatorTable")
            .field("kind", &self.kind)
            .field("operators", &self.operators)
            .finish()
    }
}

/// The full set of six tables owned by one state
#[derive(Debug)]
pub struct OperatorTables {
    tables: [Arc<OperatorTable>; 6],
}

impl OperatorTables {
    pub(crate) fn build() -> Self {
        OperatorTables {
            tables: ProxyKind::ALL.map(|kind| Arc::new(OperatorTable::new(kind))),
        }
    }

    /// Table for `kind`
    pub fn get(&self, kind: ProxyKind) -> &Arc<OperatorTable> {
        // ALL lists the kinds in declaration order
        &self.tables[kind as usize]
    }

    /// All tables
    pub fn iter(&self) -> impl Iterator<Item = &Arc<OperatorTable>> {
        self.tables.iter()
    }
}
