//! Nominal type model of the GoType dialect.
//!
//! Types are plain names (`int`, `string`, `bool`, user spellings such as
//! `uint8`). Two names are compatible when they are equal, with two
//! widenings: a parameter or variable typed `any` takes every value, and an
//! integer literal fits every integer-family type.

pub const ANY: &str = "any";
pub const NULL: &str = "null";
pub const INT: &str = "int";
pub const STRING: &str = "string";
pub const BOOL: &str = "bool";

/// Go types that accept an untyped integer literal.
pub const INTEGER_FAMILY: &[&str] = &[
    "int", "int8", "int16", "int32", "int64", "uint", "uint8", "uint16", "uint32", "uint64",
    "byte", "float32", "float64",
];

/// A resolved, named binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub ty: String,
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Variable {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// Signature of a user-defined or builtin function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub returns: String,
}

impl Function {
    pub fn new(name: impl Into<String>, params: Vec<String>, returns: impl Into<String>) -> Self {
        Function {
            name: name.into(),
            params,
            returns: returns.into(),
        }
    }
}

/// Static kind of a value as seen by the analyzer.
///
/// Integer literals are kept apart from values of type `int` because only
/// the literal form widens to the rest of the integer family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticType {
    IntLiteral,
    Named(String),
}

impl StaticType {
    pub fn name(&self) -> &str {
        match self {
            StaticType::IntLiteral => INT,
            StaticType::Named(name) => name,
        }
    }
}

/// Result of a compatibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// The value's type is exactly the expected one.
    Exact,
    /// Accepted through `any` or integer-literal widening.
    Widened,
    Incompatible,
}

impl Compatibility {
    pub fn is_ok(self) -> bool {
        !matches!(self, Compatibility::Incompatible)
    }
}

/// Check whether a value of kind `value` may be bound to `expected`.
pub fn compatibility(value: &StaticType, expected: &str) -> Compatibility {
    if value.name() == expected {
        return Compatibility::Exact;
    }
    if expected == ANY {
        return Compatibility::Widened;
    }
    match value {
        StaticType::IntLiteral if is_integer_family(expected) => Compatibility::Widened,
        _ => Compatibility::Incompatible,
    }
}

pub fn is_integer_family(name: &str) -> bool {
    INTEGER_FAMILY.contains(&name)
}
