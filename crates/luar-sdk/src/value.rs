//! Reflected host values
//!
//! [`HostValue`] follows the host aliasing rules: cloning a map, slice,
//! pointer, channel or function shares the underlying storage, cloning a
//! struct copies its fields.
//!
//! # Containers
//!
//! ```text
//! MapRef    shared FxHashMap keyed by MapKey, declared key/elem types
//! SliceRef  header (offset, len, cap) over a shared backing Vec
//! PtrRef    optional shared cell, nil pointers are typed
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::channel::ChanRef;
use crate::error::{HostError, HostResult};
use crate::func::HostFunc;
use crate::types::{FloatWidth, HostType, IntWidth, Kind, StructType};

// ============================================================================
// Opaque
// ============================================================================

/// Foreign value carried through the host side without interpretation
#[derive(Clone)]
pub struct Opaque(Arc<dyn Any + Send + Sync>);

impl Opaque {
    /// Wrap any shareable value
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Opaque(Arc::new(value))
    }

    /// Borrow the wrapped value if it has type `T`
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both refer to the same allocation
    pub fn ptr_eq(&self, other: &Opaque) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Address of the allocation
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for Opaque {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque({:#x})", self.addr())
    }
}

// ============================================================================
// HostValue
// ============================================================================

/// A reflected host value
#[derive(Debug, Clone)]
pub enum HostValue {
    /// Untyped nil
    Nil,
    /// `bool`
    Bool(bool),
    /// Signed integer of the given width
    Int(IntWidth, i64),
    /// Unsigned integer of the given width
    Uint(IntWidth, u64),
    /// Float of the given width
    Float(FloatWidth, f64),
    /// Complex number (real, imaginary)
    Complex(FloatWidth, f64, f64),
    /// `string`
    String(String),
    /// Function
    Func(HostFunc),
    /// Channel (shared)
    Chan(ChanRef),
    /// Map (shared)
    Map(MapRef),
    /// Slice (shared backing)
    Slice(SliceRef),
    /// Struct (copied)
    Struct(StructValue),
    /// Pointer (shared)
    Ptr(PtrRef),
    /// Raw address
    UnsafePointer(usize),
    /// Foreign value
    Opaque(Opaque),
}

impl HostValue {
    /// Wrap a foreign value
    pub fn opaque<T: Any + Send + Sync>(value: T) -> Self {
        HostValue::Opaque(Opaque::new(value))
    }

    /// Whether this is the untyped nil
    pub fn is_nil(&self) -> bool {
        matches!(self, HostValue::Nil)
    }

    /// Kind of the value
    pub fn kind(&self) -> Kind {
        match self {
            HostValue::Nil => Kind::Invalid,
            HostValue::Opaque(_) => Kind::Interface,
            other => other.host_type().kind(),
        }
    }

    /// Dynamic type of the value. Nil and opaque values report `interface {}`.
    pub fn host_type(&self) -> HostType {
        match self {
            HostValue::Nil | HostValue::Opaque(_) => HostType::Interface,
            HostValue::Bool(_) => HostType::Bool,
            HostValue::Int(w, _) => HostType::Int(*w),
            HostValue::Uint(w, _) => HostType::Uint(*w),
            HostValue::Float(w, _) => HostType::Float(*w),
            HostValue::Complex(w, _, _) => HostType::Complex(*w),
            HostValue::String(_) => HostType::String,
            HostValue::Func(f) => f.host_type(),
            HostValue::Chan(ch) => ch.host_type(),
            HostValue::Map(m) => HostType::Map(m.key.clone(), m.elem.clone()),
            HostValue::Slice(s) => HostType::Slice(s.elem.clone()),
            HostValue::Struct(s) => HostType::Struct(s.ty.clone()),
            HostValue::Ptr(p) => HostType::Ptr(p.elem.clone()),
            HostValue::UnsafePointer(_) => HostType::UnsafePointer,
        }
    }

    /// Type name for messages; `nil` for the untyped nil
    pub fn type_name(&self) -> String {
        match self {
            HostValue::Nil => "nil".to_string(),
            other => other.host_type().to_string(),
        }
    }

    /// Address of the shared storage for reference values
    pub fn addr(&self) -> Option<usize> {
        match self {
            HostValue::Func(f) => Some(f.addr()),
            HostValue::Chan(ch) => Some(ch.addr()),
            HostValue::Map(m) => Some(m.addr()),
            HostValue::Slice(s) => Some(s.addr()),
            HostValue::Ptr(p) => Some(p.addr()),
            HostValue::UnsafePointer(addr) => Some(*addr),
            HostValue::Opaque(o) => Some(o.addr()),
            _ => None,
        }
    }
}

impl PartialEq for HostValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Nil, HostValue::Nil) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Int(wa, a), HostValue::Int(wb, b)) => wa == wb && a == b,
            (HostValue::Uint(wa, a), HostValue::Uint(wb, b)) => wa == wb && a == b,
            (HostValue::Float(wa, a), HostValue::Float(wb, b)) => wa == wb && a == b,
            (HostValue::Complex(wa, ra, ia), HostValue::Complex(wb, rb, ib)) => {
                wa == wb && ra == rb && ia == ib
            }
            (HostValue::String(a), HostValue::String(b)) => a == b,
            (HostValue::Func(a), HostValue::Func(b)) => a.ptr_eq(b),
            (HostValue::Chan(a), HostValue::Chan(b)) => a.ptr_eq(b),
            (HostValue::Map(a), HostValue::Map(b)) => a.ptr_eq(b),
            (HostValue::Slice(a), HostValue::Slice(b)) => a.ptr_eq(b),
            (HostValue::Struct(a), HostValue::Struct(b)) => {
                HostType::Struct(a.ty.clone()) == HostType::Struct(b.ty.clone()) && a.fields == b.fields
            }
            (HostValue::Ptr(a), HostValue::Ptr(b)) => a.ptr_eq(b),
            (HostValue::UnsafePointer(a), HostValue::UnsafePointer(b)) => a == b,
            (HostValue::Opaque(a), HostValue::Opaque(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Maps and slices nested deeper than this print as their address
const MAX_FORMAT_DEPTH: usize = 32;

/// A value rendered at a nesting depth. Only the outermost pointer is
/// followed; nested pointers print as addresses, so cycles terminate.
struct GoFormat<'a>(&'a HostValue, usize);

impl fmt::Display for GoFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, depth) = (self.0, self.1);
        let nested = depth + 1;
        match value {
            HostValue::Nil => f.write_str("<nil>"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Int(_, i) => write!(f, "{}", i),
            HostValue::Uint(_, u) => write!(f, "{}", u),
            HostValue::Float(_, x) => write!(f, "{}", x),
            HostValue::Complex(_, re, im) => write!(f, "({}{:+}i)", re, im),
            HostValue::String(s) => f.write_str(s),
            HostValue::Map(m) if depth < MAX_FORMAT_DEPTH => {
                let mut rendered: Vec<String> = m
                    .entries()
                    .iter()
                    .map(|(k, v)| format!("{}:{}", GoFormat(k, nested), GoFormat(v, nested)))
                    .collect();
                rendered.sort();
                write!(f, "map[{}]", rendered.join(" "))
            }
            HostValue::Slice(s) if depth < MAX_FORMAT_DEPTH => {
                let rendered: Vec<String> = s
                    .to_vec()
                    .iter()
                    .map(|v| GoFormat(v, nested).to_string())
                    .collect();
                write!(f, "[{}]", rendered.join(" "))
            }
            HostValue::Struct(s) => {
                f.write_str("{")?;
                for (i, (field, value)) in s.ty.fields().iter().zip(&s.fields).enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}:{}", field.name, GoFormat(value, nested))?;
                }
                f.write_str("}")
            }
            HostValue::Ptr(p) if p.is_nil() => f.write_str("<nil>"),
            HostValue::Ptr(p) if depth == 0 => match p.load() {
                Ok(target @ HostValue::Struct(_)) => write!(f, "&{}", GoFormat(&target, nested)),
                _ => write!(f, "{:#x}", p.addr()),
            },
            HostValue::Ptr(p) => write!(f, "{:#x}", p.addr()),
            HostValue::Map(_)
            | HostValue::Slice(_)
            | HostValue::Func(_)
            | HostValue::Chan(_)
            | HostValue::UnsafePointer(_)
            | HostValue::Opaque(_) => write!(f, "{:#x}", value.addr().unwrap_or(0)),
        }
    }
}

/// Formats like Go's `%+v`
impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&GoFormat(self, 0), f)
    }
}

macro_rules! impl_from_primitive {
    ($($ty:ty => |$v:ident| $body:expr),* $(,)?) => {
        $(
            impl From<$ty> for HostValue {
                fn from($v: $ty) -> Self {
                    $body
                }
            }
        )*
    };
}

impl_from_primitive! {
    bool => |v| HostValue::Bool(v),
    i8 => |v| HostValue::Int(IntWidth::W8, v as i64),
    i16 => |v| HostValue::Int(IntWidth::W16, v as i64),
    i32 => |v| HostValue::Int(IntWidth::W32, v as i64),
    i64 => |v| HostValue::Int(IntWidth::W64, v),
    isize => |v| HostValue::Int(IntWidth::Size, v as i64),
    u8 => |v| HostValue::Uint(IntWidth::W8, v as u64),
    u16 => |v| HostValue::Uint(IntWidth::W16, v as u64),
    u32 => |v| HostValue::Uint(IntWidth::W32, v as u64),
    u64 => |v| HostValue::Uint(IntWidth::W64, v),
    usize => |v| HostValue::Uint(IntWidth::Size, v as u64),
    f32 => |v| HostValue::Float(FloatWidth::W32, v as f64),
    f64 => |v| HostValue::Float(FloatWidth::W64, v),
    String => |v| HostValue::String(v),
    &str => |v| HostValue::String(v.to_string()),
    HostFunc => |v| HostValue::Func(v),
    ChanRef => |v| HostValue::Chan(v),
    MapRef => |v| HostValue::Map(v),
    SliceRef => |v| HostValue::Slice(v),
    StructValue => |v| HostValue::Struct(v),
    PtrRef => |v| HostValue::Ptr(v),
    Opaque => |v| HostValue::Opaque(v),
}

fn check_assignable(ty: &HostType, value: &HostValue) -> HostResult<()> {
    if ty.is_assignable_from(value) {
        Ok(())
    } else {
        Err(HostError::mismatch(ty, value.type_name()))
    }
}

// ============================================================================
// Structs
// ============================================================================

/// Struct value; cloning copies the fields
#[derive(Debug, Clone)]
pub struct StructValue {
    ty: Arc<StructType>,
    fields: Vec<HostValue>,
}

impl StructValue {
    /// Struct with every field at its zero value
    pub fn zero(ty: Arc<StructType>) -> Self {
        let fields = ty.fields().iter().map(|f| f.ty.zero_value()).collect();
        StructValue { ty, fields }
    }

    /// Struct from field values in declaration order
    pub fn new(ty: Arc<StructType>, fields: Vec<HostValue>) -> HostResult<Self> {
        if fields.len() != ty.fields().len() {
            return Err(HostError::Arity {
                expected: ty.fields().len(),
                got: fields.len(),
            });
        }
        for (field, value) in ty.fields().iter().zip(&fields) {
            check_assignable(&field.ty, value)?;
        }
        Ok(StructValue { ty, fields })
    }

    /// The struct type
    pub fn ty(&self) -> &Arc<StructType> {
        &self.ty
    }

    /// Field values in declaration order
    pub fn fields(&self) -> &[HostValue] {
        &self.fields
    }

    /// Field by position
    pub fn field_at(&self, index: usize) -> Option<&HostValue> {
        self.fields.get(index)
    }

    /// Field by name, exported or not
    pub fn field(&self, name: &str) -> Option<&HostValue> {
        let (index, _) = self.ty.field(name)?;
        self.fields.get(index)
    }

    /// Replace a field by position
    pub fn set_field_at(&mut self, index: usize, value: HostValue) -> HostResult<()> {
        let field = self.ty.fields().get(index).ok_or(HostError::IndexOutOfRange {
            index,
            len: self.fields.len(),
        })?;
        check_assignable(&field.ty, &value)?;
        self.fields[index] = value;
        Ok(())
    }

    /// Replace a field by name
    pub fn set_field(&mut self, name: &str, value: HostValue) -> HostResult<()> {
        let (index, _) = self
            .ty
            .field(name)
            .ok_or_else(|| HostError::Call(format!("{} has no field {}", self.ty.name(), name)))?;
        self.set_field_at(index, value)
    }

    /// Builder-style field assignment
    pub fn with(mut self, name: &str, value: impl Into<HostValue>) -> HostResult<Self> {
        self.set_field(name, value.into())?;
        Ok(self)
    }
}

// ============================================================================
// Pointers
// ============================================================================

/// Pointer to a shared cell
#[derive(Clone)]
pub struct PtrRef {
    elem: Arc<HostType>,
    cell: Option<Arc<Mutex<HostValue>>>,
}

impl PtrRef {
    /// Allocate a cell holding `value`, typed by the value's dynamic type
    pub fn new(value: HostValue) -> Self {
        let elem = value.host_type();
        Self::with_type(elem, value)
    }

    /// Allocate a cell for an explicitly typed value
    pub fn with_type(elem: HostType, value: HostValue) -> Self {
        PtrRef {
            elem: Arc::new(elem),
            cell: Some(Arc::new(Mutex::new(value))),
        }
    }

    /// Typed nil pointer
    pub fn nil(elem: HostType) -> Self {
        PtrRef {
            elem: Arc::new(elem),
            cell: None,
        }
    }

    /// Whether this pointer is nil
    pub fn is_nil(&self) -> bool {
        self.cell.is_none()
    }

    /// Pointee type
    pub fn elem_type(&self) -> &HostType {
        &self.elem
    }

    /// Copy of the pointee
    pub fn load(&self) -> HostResult<HostValue> {
        let cell = self.cell.as_ref().ok_or(HostError::NilPointer)?;
        let value = cell.lock().clone();
        Ok(value)
    }

    /// Replace the pointee
    pub fn store(&self, value: HostValue) -> HostResult<()> {
        check_assignable(&self.elem, &value)?;
        let cell = self.cell.as_ref().ok_or(HostError::NilPointer)?;
        *cell.lock() = value;
        Ok(())
    }

    /// Run `f` with mutable access to the pointee
    pub fn with<R>(&self, f: impl FnOnce(&mut HostValue) -> R) -> HostResult<R> {
        let cell = self.cell.as_ref().ok_or(HostError::NilPointer)?;
        let mut guard = cell.lock();
        Ok(f(&mut guard))
    }

    /// Pointer identity; two nil pointers are equal
    pub fn ptr_eq(&self, other: &PtrRef) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }

    /// Address of the cell, 0 when nil
    pub fn addr(&self) -> usize {
        self.cell
            .as_ref()
            .map(|c| Arc::as_ptr(c) as usize)
            .unwrap_or(0)
    }
}

impl fmt::Debug for PtrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PtrRef")
            .field("elem", &self.elem.to_string())
            .field("addr", &format_args!("{:#x}", self.addr()))
            .finish()
    }
}

// ============================================================================
// Slices
// ============================================================================

/// Capacity for a slice of capacity `old_cap` that must hold `needed` items.
///
/// Doubles small slices and grows large ones by roughly 1.25x, never
/// returning less than `needed`.
pub fn grow_capacity(old_cap: usize, needed: usize) -> usize {
    let doubled = old_cap.saturating_mul(2);
    if needed > doubled {
        return needed;
    }
    if old_cap < 256 {
        return doubled;
    }
    let mut cap = old_cap;
    while cap < needed {
        cap += (cap + 3 * 256) / 4;
    }
    cap
}

/// Slice header over a shared backing array.
///
/// The backing vector always has at least `offset + cap` elements; slots
/// past `len` hold zero values.
#[derive(Clone)]
pub struct SliceRef {
    elem: Arc<HostType>,
    backing: Arc<Mutex<Vec<HostValue>>>,
    offset: usize,
    len: usize,
    cap: usize,
}

impl SliceRef {
    /// Empty slice with no capacity
    pub fn new(elem: HostType) -> Self {
        SliceRef {
            elem: Arc::new(elem),
            backing: Arc::new(Mutex::new(Vec::new())),
            offset: 0,
            len: 0,
            cap: 0,
        }
    }

    /// Slice of `len` zero values with room for `cap`
    pub fn with_capacity(elem: HostType, len: usize, cap: usize) -> Self {
        let cap = cap.max(len);
        let backing = (0..cap).map(|_| elem.zero_value()).collect();
        SliceRef {
            elem: Arc::new(elem),
            backing: Arc::new(Mutex::new(backing)),
            offset: 0,
            len,
            cap,
        }
    }

    /// Slice holding `values`; length and capacity equal the item count
    pub fn from_values(elem: HostType, values: Vec<HostValue>) -> HostResult<Self> {
        for value in &values {
            check_assignable(&elem, value)?;
        }
        let len = values.len();
        Ok(SliceRef {
            elem: Arc::new(elem),
            backing: Arc::new(Mutex::new(values)),
            offset: 0,
            len,
            cap: len,
        })
    }

    /// Element type
    pub fn elem_type(&self) -> &HostType {
        &self.elem
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the slice has no elements
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity
    pub fn cap(&self) -> usize {
        self.cap
    }

    /// Element at a zero-based index
    pub fn get(&self, index: usize) -> Option<HostValue> {
        if index >= self.len {
            return None;
        }
        self.backing.lock().get(self.offset + index).cloned()
    }

    /// Replace the element at a zero-based index
    pub fn set(&self, index: usize, value: HostValue) -> HostResult<()> {
        if index >= self.len {
            return Err(HostError::IndexOutOfRange {
                index,
                len: self.len,
            });
        }
        check_assignable(&self.elem, &value)?;
        self.backing.lock()[self.offset + index] = value;
        Ok(())
    }

    /// Append `items`, returning the grown slice.
    ///
    /// The backing array is reused when capacity allows, so the result may
    /// alias `self`; otherwise the items are copied into a new allocation
    /// and `self` is left untouched.
    pub fn append(&self, items: Vec<HostValue>) -> HostResult<SliceRef> {
        for item in &items {
            check_assignable(&self.elem, item)?;
        }
        let needed = self.len + items.len();
        if needed <= self.cap {
            let mut backing = self.backing.lock();
            let start = self.offset + self.len;
            for (i, item) in items.into_iter().enumerate() {
                backing[start + i] = item;
            }
            return Ok(SliceRef {
                len: needed,
                ..self.clone()
            });
        }

        let cap = grow_capacity(self.cap, needed);
        let mut data = Vec::with_capacity(cap);
        data.extend(self.to_vec());
        data.extend(items);
        data.resize_with(cap, || self.elem.zero_value());
        Ok(SliceRef {
            elem: self.elem.clone(),
            backing: Arc::new(Mutex::new(data)),
            offset: 0,
            len: needed,
            cap,
        })
    }

    /// Sub-slice `[low, high)` sharing the backing array
    pub fn slice(&self, low: usize, high: usize) -> HostResult<SliceRef> {
        if low > high || high > self.cap {
            return Err(HostError::IndexOutOfRange {
                index: high,
                len: self.cap,
            });
        }
        Ok(SliceRef {
            elem: self.elem.clone(),
            backing: self.backing.clone(),
            offset: self.offset + low,
            len: high - low,
            cap: self.cap - low,
        })
    }

    /// Copy of the elements
    pub fn to_vec(&self) -> Vec<HostValue> {
        let backing = self.backing.lock();
        backing[self.offset..self.offset + self.len].to_vec()
    }

    /// Whether both slices use the same backing array
    pub fn shares_backing(&self, other: &SliceRef) -> bool {
        Arc::ptr_eq(&self.backing, &other.backing)
    }

    /// Same backing array, offset and length
    pub fn ptr_eq(&self, other: &SliceRef) -> bool {
        self.shares_backing(other) && self.offset == other.offset && self.len == other.len
    }

    /// Address of the first element's backing storage
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.backing) as usize + self.offset
    }
}

impl fmt::Debug for SliceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceRef")
            .field("elem", &self.elem.to_string())
            .field("len", &self.len)
            .field("cap", &self.cap)
            .finish()
    }
}

// ============================================================================
// Maps
// ============================================================================

/// Hashable form of a comparable host value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    /// Untyped nil
    Nil,
    /// Boolean
    Bool(bool),
    /// Signed integer
    Int(i64),
    /// Unsigned integer
    Uint(u64),
    /// Float bits, with -0.0 folded into 0.0
    Float(u64),
    /// Complex bits
    Complex(u64, u64),
    /// String
    String(String),
    /// Identity of a pointer, channel or foreign value
    Ref(usize),
    /// Struct compared field by field
    Struct(Vec<MapKey>),
}

fn float_bits(x: f64) -> u64 {
    if x == 0.0 {
        0.0f64.to_bits()
    } else {
        x.to_bits()
    }
}

impl MapKey {
    /// Key for `value`; functions, maps and slices are not comparable
    pub fn from_value(value: &HostValue) -> HostResult<Self> {
        Ok(match value {
            HostValue::Nil => MapKey::Nil,
            HostValue::Bool(b) => MapKey::Bool(*b),
            HostValue::Int(_, i) => MapKey::Int(*i),
            HostValue::Uint(_, u) => MapKey::Uint(*u),
            HostValue::Float(_, x) => MapKey::Float(float_bits(*x)),
            HostValue::Complex(_, re, im) => MapKey::Complex(float_bits(*re), float_bits(*im)),
            HostValue::String(s) => MapKey::String(s.clone()),
            HostValue::Chan(ch) => MapKey::Ref(ch.addr()),
            HostValue::Ptr(p) => MapKey::Ref(p.addr()),
            HostValue::UnsafePointer(addr) => MapKey::Ref(*addr),
            HostValue::Opaque(o) => MapKey::Ref(o.addr()),
            HostValue::Struct(s) => MapKey::Struct(
                s.fields()
                    .iter()
                    .map(MapKey::from_value)
                    .collect::<HostResult<Vec<_>>>()?,
            ),
            HostValue::Func(_) | HostValue::Map(_) | HostValue::Slice(_) => {
                return Err(HostError::Unhashable(value.type_name()))
            }
        })
    }
}

#[derive(Debug, Clone)]
struct MapEntry {
    key: HostValue,
    value: HostValue,
}

/// Shared map with declared key and element types
#[derive(Clone)]
pub struct MapRef {
    key: Arc<HostType>,
    elem: Arc<HostType>,
    entries: Arc<Mutex<FxHashMap<MapKey, MapEntry>>>,
}

impl MapRef {
    /// Empty map
    pub fn new(key: HostType, elem: HostType) -> Self {
        MapRef {
            key: Arc::new(key),
            elem: Arc::new(elem),
            entries: Arc::new(Mutex::new(FxHashMap::default())),
        }
    }

    /// Map filled from key/value pairs
    pub fn from_pairs<K, V>(
        key: HostType,
        elem: HostType,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> HostResult<Self>
    where
        K: Into<HostValue>,
        V: Into<HostValue>,
    {
        let map = MapRef::new(key, elem);
        for (k, v) in pairs {
            map.insert(k.into(), v.into())?;
        }
        Ok(map)
    }

    /// Declared key type
    pub fn key_type(&self) -> &HostType {
        &self.key
    }

    /// Declared element type
    pub fn elem_type(&self) -> &HostType {
        &self.elem
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the map has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn map_key(&self, key: &HostValue) -> HostResult<MapKey> {
        check_assignable(&self.key, key)?;
        MapKey::from_value(key)
    }

    /// Value stored under `key`, if any
    pub fn get(&self, key: &HostValue) -> HostResult<Option<HostValue>> {
        let key = self.map_key(key)?;
        Ok(self.entries.lock().get(&key).map(|e| e.value.clone()))
    }

    /// Store `value` under `key`
    pub fn insert(&self, key: HostValue, value: HostValue) -> HostResult<()> {
        let map_key = self.map_key(&key)?;
        check_assignable(&self.elem, &value)?;
        self.entries.lock().insert(map_key, MapEntry { key, value });
        Ok(())
    }

    /// Remove `key`, returning its value
    pub fn remove(&self, key: &HostValue) -> HostResult<Option<HostValue>> {
        let key = self.map_key(key)?;
        Ok(self.entries.lock().remove(&key).map(|e| e.value))
    }

    /// Snapshot of the keys in unspecified order
    pub fn keys(&self) -> Vec<HostValue> {
        self.entries.lock().values().map(|e| e.key.clone()).collect()
    }

    /// Snapshot of the entries in unspecified order
    pub fn entries(&self) -> Vec<(HostValue, HostValue)> {
        self.entries
            .lock()
            .values()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    /// Whether both refer to the same map
    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    /// Address of the map storage
    pub fn addr(&self) -> usize {
        Arc::as_ptr(&self.entries) as usize
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapRef")
            .field("key", &self.key.to_string())
            .field("elem", &self.elem.to_string())
            .field("len", &self.len())
            .finish()
    }
}
