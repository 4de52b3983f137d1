//! Type representation for the Sable language
//!
//! Analysis annotates expressions with these types; the language server's
//! hover handler renders them through `Display` (short form, unqualified).

use crate::ast::DeclRef;
use std::fmt;

/// A Sable type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// `bool`
    Bool,
    /// `u256`, the native EVM word
    U256,
    /// `address`
    Address,
    /// `string`
    Str,
    /// The type of statements and functions without a return type
    Unit,
    /// A function signature
    Function {
        params: Vec<Type>,
        ret: Option<Box<Type>>,
    },
    /// A user-defined struct
    Struct { decl: DeclRef, name: String },
    /// A user-defined enum
    Enum { decl: DeclRef, name: String },
    /// A contract
    Contract { decl: DeclRef, name: String },
    /// The type of an expression naming a type (e.g. the `Phase` in
    /// `Phase.Open`)
    TypeOf(Box<Type>),
    /// Produced when analysis could not determine a type; never reported
    Unknown,
}

impl Type {
    /// Look up a built-in type by name.
    pub fn builtin(name: &str) -> Option<Type> {
        match name {
            "bool" => Some(Type::Bool),
            "u256" => Some(Type::U256),
            "address" => Some(Type::Address),
            "string" => Some(Type::Str),
            _ => None,
        }
    }

    /// Whether two types are interchangeable in an assignment. `Unknown`
    /// is compatible with everything so unresolved code does not cascade.
    pub fn compatible(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Unknown, _) | (_, Type::Unknown) => true,
            (Type::Function { .. }, Type::Function { .. }) => true,
            _ => self == other,
        }
    }

    /// The declaration a nominal type points back to, if any.
    pub fn decl(&self) -> Option<DeclRef> {
        match self {
            Type::Struct { decl, .. } | Type::Enum { decl, .. } | Type::Contract { decl, .. } => {
                Some(*decl)
            }
            Type::TypeOf(inner) => inner.decl(),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Bool => write!(f, "bool"),
            Type::U256 => write!(f, "u256"),
            Type::Address => write!(f, "address"),
            Type::Str => write!(f, "string"),
            Type::Unit => write!(f, "()"),
            Type::Function { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ")")?;
                if let Some(ret) = ret {
                    write!(f, " -> {ret}")?;
                }
                Ok(())
            }
            Type::Struct { name, .. } => write!(f, "struct {name}"),
            Type::Enum { name, .. } => write!(f, "enum {name}"),
            Type::Contract { name, .. } => write!(f, "contract {name}"),
            Type::TypeOf(inner) => write!(f, "type({inner})"),
            Type::Unknown => write!(f, "<unknown>"),
        }
    }
}
