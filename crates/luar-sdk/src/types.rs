//! Host type descriptors
//!
//! A [`HostType`] is the runtime type information for a [`HostValue`]. The
//! bridge classifies values by [`Kind`], uses types as hints when rebuilding
//! host values from script values, and builds zero values from them.
//!
//! Types print in Go-like notation (`map[string]int`, `[]string`, `*Person`,
//! `chan<- int`) since that is the notation scripts see in `tostring`.

use std::fmt;
use std::sync::Arc;

use crate::func::HostFunc;
use crate::value::{HostValue, MapRef, PtrRef, SliceRef, StructValue};

// ============================================================================
// Widths and directions
// ============================================================================

/// Integer width. `Size` is the platform word (`int` / `uint`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// Platform word
    Size,
    /// 8 bits
    W8,
    /// 16 bits
    W16,
    /// 32 bits
    W32,
    /// 64 bits
    W64,
}

impl IntWidth {
    fn suffix(self) -> &'static str {
        match self {
            IntWidth::Size => "",
            IntWidth::W8 => "8",
            IntWidth::W16 => "16",
            IntWidth::W32 => "32",
            IntWidth::W64 => "64",
        }
    }
}

/// Floating point width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// `float32` / `complex64`
    W32,
    /// `float64` / `complex128`
    W64,
}

/// Channel direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChanDir {
    /// Send and receive
    Both,
    /// Send only (`chan<- T`)
    Send,
    /// Receive only (`<-chan T`)
    Recv,
}

impl ChanDir {
    /// Whether values may be sent
    pub fn can_send(self) -> bool {
        !matches!(self, ChanDir::Recv)
    }

    /// Whether values may be received
    pub fn can_recv(self) -> bool {
        !matches!(self, ChanDir::Send)
    }
}

// ============================================================================
// Kind
// ============================================================================

/// Coarse runtime category of a host type or value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// The untyped nil value
    Invalid,
    /// `bool`
    Bool,
    /// Signed integers
    Int,
    /// Unsigned integers
    Uint,
    /// Floats
    Float,
    /// Complex numbers
    Complex,
    /// `string`
    String,
    /// Functions
    Func,
    /// Channels
    Chan,
    /// Maps
    Map,
    /// Slices
    Slice,
    /// Structs
    Struct,
    /// Pointers
    Ptr,
    /// Interface values and opaque foreign values
    Interface,
    /// Raw addresses
    UnsafePointer,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Invalid => "invalid",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Uint => "uint",
            Kind::Float => "float",
            Kind::Complex => "complex",
            Kind::String => "string",
            Kind::Func => "func",
            Kind::Chan => "chan",
            Kind::Map => "map",
            Kind::Slice => "slice",
            Kind::Struct => "struct",
            Kind::Ptr => "ptr",
            Kind::Interface => "interface",
            Kind::UnsafePointer => "unsafe.Pointer",
        };
        f.write_str(name)
    }
}

// ============================================================================
// HostType
// ============================================================================

/// Runtime type descriptor for host values
#[derive(Debug, Clone)]
pub enum HostType {
    /// `bool`
    Bool,
    /// Signed integer
    Int(IntWidth),
    /// Unsigned integer
    Uint(IntWidth),
    /// Float
    Float(FloatWidth),
    /// Complex number
    Complex(FloatWidth),
    /// `string`
    String,
    /// Function signature
    Func(Arc<FuncType>),
    /// Channel of the element type
    Chan(ChanDir, Arc<HostType>),
    /// Map from key type to element type
    Map(Arc<HostType>, Arc<HostType>),
    /// Slice of the element type
    Slice(Arc<HostType>),
    /// Named struct
    Struct(Arc<StructType>),
    /// Pointer to the element type
    Ptr(Arc<HostType>),
    /// Empty interface: accepts any value
    Interface,
    /// Raw address
    UnsafePointer,
}

impl HostType {
    /// `bool`
    pub const BOOL: HostType = HostType::Bool;
    /// `int`
    pub const INT: HostType = HostType::Int(IntWidth::Size);
    /// `int64`
    pub const INT64: HostType = HostType::Int(IntWidth::W64);
    /// `uint`
    pub const UINT: HostType = HostType::Uint(IntWidth::Size);
    /// `float64`
    pub const FLOAT64: HostType = HostType::Float(FloatWidth::W64);
    /// `string`
    pub const STRING: HostType = HostType::String;
    /// `interface {}`
    pub const ANY: HostType = HostType::Interface;

    /// `[]elem`
    pub fn slice(elem: HostType) -> Self {
        HostType::Slice(Arc::new(elem))
    }

    /// `map[key]elem`
    pub fn map(key: HostType, elem: HostType) -> Self {
        HostType::Map(Arc::new(key), Arc::new(elem))
    }

    /// `*elem`
    pub fn ptr(elem: HostType) -> Self {
        HostType::Ptr(Arc::new(elem))
    }

    /// `chan elem`
    pub fn chan(elem: HostType) -> Self {
        HostType::Chan(ChanDir::Both, Arc::new(elem))
    }

    /// Function type with fixed parameters
    pub fn func(params: Vec<HostType>, results: Vec<HostType>) -> Self {
        HostType::Func(Arc::new(FuncType::new(params, results)))
    }

    /// The kind this type belongs to
    pub fn kind(&self) -> Kind {
        match self {
            HostType::Bool => Kind::Bool,
            HostType::Int(_) => Kind::Int,
            HostType::Uint(_) => Kind::Uint,
            HostType::Float(_) => Kind::Float,
            HostType::Complex(_) => Kind::Complex,
            HostType::String => Kind::String,
            HostType::Func(_) => Kind::Func,
            HostType::Chan(..) => Kind::Chan,
            HostType::Map(..) => Kind::Map,
            HostType::Slice(_) => Kind::Slice,
            HostType::Struct(_) => Kind::Struct,
            HostType::Ptr(_) => Kind::Ptr,
            HostType::Interface => Kind::Interface,
            HostType::UnsafePointer => Kind::UnsafePointer,
        }
    }

    /// Whether this is one of the numeric types a script number converts to
    pub fn is_numeric(&self) -> bool {
        matches!(self, HostType::Int(_) | HostType::Uint(_) | HostType::Float(_))
    }

    /// Zero value of this type.
    ///
    /// Maps and slices are allocated empty rather than nil; functions,
    /// channels, interfaces and raw addresses are the untyped nil.
    pub fn zero_value(&self) -> HostValue {
        match self {
            HostType::Bool => HostValue::Bool(false),
            HostType::Int(w) => HostValue::Int(*w, 0),
            HostType::Uint(w) => HostValue::Uint(*w, 0),
            HostType::Float(w) => HostValue::Float(*w, 0.0),
            HostType::Complex(w) => HostValue::Complex(*w, 0.0, 0.0),
            HostType::String => HostValue::String(String::new()),
            HostType::Func(_) | HostType::Chan(..) | HostType::Interface | HostType::UnsafePointer => {
                HostValue::Nil
            }
            HostType::Map(key, elem) => {
                HostValue::Map(MapRef::new((**key).clone(), (**elem).clone()))
            }
            HostType::Slice(elem) => HostValue::Slice(SliceRef::new((**elem).clone())),
            HostType::Struct(ty) => HostValue::Struct(StructValue::zero(ty.clone())),
            HostType::Ptr(elem) => HostValue::Ptr(PtrRef::nil((**elem).clone())),
        }
    }

    /// Whether `value` may be stored in a location of this type
    pub fn is_assignable_from(&self, value: &HostValue) -> bool {
        match (self, value) {
            (HostType::Interface, _) => true,
            (
                HostType::Func(_)
                | HostType::Chan(..)
                | HostType::Map(..)
                | HostType::Slice(_)
                | HostType::Ptr(_)
                | HostType::UnsafePointer,
                HostValue::Nil,
            ) => true,
            (HostType::Chan(dir, elem), HostValue::Chan(ch)) => {
                **elem == *ch.elem_type() && (*dir == ch.dir() || ch.dir() == ChanDir::Both)
            }
            _ => value.host_type() == *self,
        }
    }
}

impl PartialEq for HostType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostType::Bool, HostType::Bool)
            | (HostType::String, HostType::String)
            | (HostType::Interface, HostType::Interface)
            | (HostType::UnsafePointer, HostType::UnsafePointer) => true,
            (HostType::Int(a), HostType::Int(b)) | (HostType::Uint(a), HostType::Uint(b)) => a == b,
            (HostType::Float(a), HostType::Float(b)) | (HostType::Complex(a), HostType::Complex(b)) => {
                a == b
            }
            (HostType::Func(a), HostType::Func(b)) => a == b,
            (HostType::Chan(da, ea), HostType::Chan(db, eb)) => da == db && ea == eb,
            (HostType::Map(ka, va), HostType::Map(kb, vb)) => ka == kb && va == vb,
            (HostType::Slice(a), HostType::Slice(b)) | (HostType::Ptr(a), HostType::Ptr(b)) => a == b,
            // Named types are identical by name
            (HostType::Struct(a), HostType::Struct(b)) => Arc::ptr_eq(a, b) || a.name == b.name,
            _ => false,
        }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostType::Bool => f.write_str("bool"),
            HostType::Int(w) => write!(f, "int{}", w.suffix()),
            HostType::Uint(w) => write!(f, "uint{}", w.suffix()),
            HostType::Float(FloatWidth::W32) => f.write_str("float32"),
            HostType::Float(FloatWidth::W64) => f.write_str("float64"),
            HostType::Complex(FloatWidth::W32) => f.write_str("complex64"),
            HostType::Complex(FloatWidth::W64) => f.write_str("complex128"),
            HostType::String => f.write_str("string"),
            HostType::Func(ty) => write!(f, "{}", ty),
            HostType::Chan(ChanDir::Both, elem) => write!(f, "chan {}", elem),
            HostType::Chan(ChanDir::Send, elem) => write!(f, "chan<- {}", elem),
            HostType::Chan(ChanDir::Recv, elem) => write!(f, "<-chan {}", elem),
            HostType::Map(key, elem) => write!(f, "map[{}]{}", key, elem),
            HostType::Slice(elem) => write!(f, "[]{}", elem),
            HostType::Struct(ty) => f.write_str(&ty.name),
            HostType::Ptr(elem) => write!(f, "*{}", elem),
            HostType::Interface => f.write_str("interface {}"),
            HostType::UnsafePointer => f.write_str("unsafe.Pointer"),
        }
    }
}

// ============================================================================
// Function types
// ============================================================================

/// Function signature.
///
/// When `variadic` is set the last parameter is a slice type and callers may
/// pass any number of trailing elements.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncType {
    /// Parameter types in order
    pub params: Vec<HostType>,
    /// Result types in order
    pub results: Vec<HostType>,
    /// Whether the last parameter collects trailing arguments
    pub variadic: bool,
}

impl FuncType {
    /// Create a fixed-arity signature
    pub fn new(params: Vec<HostType>, results: Vec<HostType>) -> Self {
        FuncType {
            params,
            results,
            variadic: false,
        }
    }

    /// Create a variadic signature whose trailing elements have type `rest`
    pub fn variadic(mut params: Vec<HostType>, rest: HostType, results: Vec<HostType>) -> Self {
        params.push(HostType::slice(rest));
        FuncType {
            params,
            results,
            variadic: true,
        }
    }

    /// Number of parameters that must always be supplied
    pub fn required_params(&self) -> usize {
        if self.variadic {
            self.params.len().saturating_sub(1)
        } else {
            self.params.len()
        }
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("func(")?;
        let last = self.params.len().saturating_sub(1);
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match (self.variadic && i == last, param) {
                (true, HostType::Slice(elem)) => write!(f, "...{}", elem)?,
                _ => write!(f, "{}", param)?,
            }
        }
        f.write_str(")")?;
        match self.results.len() {
            0 => Ok(()),
            1 => write!(f, " {}", self.results[0]),
            _ => {
                f.write_str(" (")?;
                for (i, result) in self.results.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", result)?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// Struct types
// ============================================================================

/// A struct field
#[derive(Debug, Clone)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: HostType,
    /// Whether scripts may see the field
    pub exported: bool,
}

/// Method receiver form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Receiver {
    /// Receives a copy of the struct; callable on values and pointers
    Value,
    /// Receives a pointer; callable only through a pointer
    Pointer,
}

/// A method declared on a struct type.
///
/// The function's first parameter is the receiver: the struct value for
/// [`Receiver::Value`], a pointer to it for [`Receiver::Pointer`].
#[derive(Debug, Clone)]
pub struct Method {
    /// Method name
    pub name: String,
    /// Receiver form
    pub receiver: Receiver,
    /// Implementation, receiver first
    pub func: HostFunc,
}

/// Named struct type with ordered fields and a method set
#[derive(Debug)]
pub struct StructType {
    name: String,
    fields: Vec<Field>,
    methods: Vec<Method>,
}

impl StructType {
    /// Start building a struct type
    pub fn builder(name: impl Into<String>) -> StructTypeBuilder {
        StructTypeBuilder {
            name: name.into(),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by name regardless of visibility
    pub fn field(&self, name: &str) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.name == name)
    }

    /// Look up a field visible to scripts
    pub fn exported_field(&self, name: &str) -> Option<(usize, &Field)> {
        self.field(name).filter(|(_, f)| f.exported)
    }

    /// All declared methods
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// Look up a method by name
    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// Builder for [`StructType`]
pub struct StructTypeBuilder {
    name: String,
    fields: Vec<Field>,
    methods: Vec<Method>,
}

impl StructTypeBuilder {
    /// Add an exported field
    pub fn field(mut self, name: impl Into<String>, ty: HostType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            exported: true,
        });
        self
    }

    /// Add a field hidden from scripts
    pub fn private_field(mut self, name: impl Into<String>, ty: HostType) -> Self {
        self.fields.push(Field {
            name: name.into(),
            ty,
            exported: false,
        });
        self
    }

    /// Add a value-receiver method
    pub fn method(mut self, name: impl Into<String>, func: HostFunc) -> Self {
        self.methods.push(Method {
            name: name.into(),
            receiver: Receiver::Value,
            func,
        });
        self
    }

    /// Add a pointer-receiver method
    pub fn pointer_method(mut self, name: impl Into<String>, func: HostFunc) -> Self {
        self.methods.push(Method {
            name: name.into(),
            receiver: Receiver::Pointer,
            func,
        });
        self
    }

    /// Finish the type
    pub fn build(self) -> Arc<StructType> {
        Arc::new(StructType {
            name: self.name,
            fields: self.fields,
            methods: self.methods,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_display() {
        assert_eq!(HostType::map(HostType::STRING, HostType::INT).to_string(), "map[string]int");
        assert_eq!(HostType::slice(HostType::Uint(IntWidth::W8)).to_string(), "[]uint8");
        assert_eq!(
            HostType::Chan(ChanDir::Send, Arc::new(HostType::FLOAT64)).to_string(),
            "chan<- float64"
        );
        assert_eq!(
            HostType::func(vec![HostType::STRING, HostType::UINT], vec![HostType::STRING]).to_string(),
            "func(string, uint) string"
        );
        let variadic = FuncType::variadic(vec![HostType::STRING], HostType::INT, vec![]);
        assert_eq!(variadic.to_string(), "func(string, ...int)");
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(HostType::INT.zero_value(), HostValue::Int(IntWidth::Size, 0));
        assert_eq!(HostType::STRING.zero_value(), HostValue::String(String::new()));
        assert!(HostType::ANY.zero_value().is_nil());

        let person = StructType::builder("Person").field("Name", HostType::STRING).build();
        match HostType::Struct(person).zero_value() {
            HostValue::Struct(value) => {
                assert_eq!(value.field("Name"), Some(&HostValue::String(String::new())));
            }
            other => panic!("expected struct, got {:?}", other),
        }

        match HostType::ptr(HostType::INT).zero_value() {
            HostValue::Ptr(ptr) => assert!(ptr.is_nil()),
            other => panic!("expected pointer, got {:?}", other),
        }
    }

    #[test]
    fn test_assignability() {
        assert!(HostType::ANY.is_assignable_from(&HostValue::from(3i64)));
        assert!(HostType::INT64.is_assignable_from(&HostValue::from(3i64)));
        assert!(!HostType::INT.is_assignable_from(&HostValue::from(3i64)));
        assert!(HostType::ptr(HostType::INT).is_assignable_from(&HostValue::Nil));
        assert!(!HostType::STRING.is_assignable_from(&HostValue::Nil));
    }

    #[test]
    fn test_struct_lookup() {
        let ty = StructType::builder("Person")
            .field("Name", HostType::STRING)
            .private_field("secret", HostType::STRING)
            .build();
        assert_eq!(ty.field("secret").map(|(i, _)| i), Some(1));
        assert!(ty.exported_field("secret").is_none());
        assert!(ty.exported_field("Name").is_some());
        assert!(ty.method("Name").is_none());
    }
}
