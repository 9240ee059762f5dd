//! Structural type references as handed over by the host compiler.

use std::fmt;

use dicat_core::Name;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Number,
    Boolean,
    Bigint,
    Symbol,
    Any,
    Unknown,
    Never,
    Undefined,
    Null,
    Void,
}

impl PrimitiveType {
    pub fn keyword(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Bigint => "bigint",
            PrimitiveType::Symbol => "symbol",
            PrimitiveType::Any => "any",
            PrimitiveType::Unknown => "unknown",
            PrimitiveType::Never => "never",
            PrimitiveType::Undefined => "undefined",
            PrimitiveType::Null => "null",
            PrimitiveType::Void => "void",
        }
    }
}

/// A member of an object-shaped type (object literal type, interface or class instance).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeMember {
    Property {
        name: Name,
        #[serde(default)]
        optional: bool,
        ty: TypeRef,
    },
    Method {
        name: Name,
        #[serde(default)]
        params: Vec<TypeRef>,
        ret: TypeRef,
    },
}

impl TypeMember {
    pub fn name(&self) -> &Name {
        match self {
            TypeMember::Property { name, .. } | TypeMember::Method { name, .. } => name,
        }
    }
}

/// A type as written at a use site.
///
/// Names are unresolved: `Named` is looked up through the declaring file's
/// scope (local declarations, imports, re-exports) when it gets qualified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TypeRef {
    Named {
        name: Name,
        #[serde(default)]
        args: Vec<TypeRef>,
    },
    Primitive {
        name: PrimitiveType,
    },
    StringLiteral {
        value: String,
    },
    NumberLiteral {
        value: String,
    },
    BooleanLiteral {
        value: bool,
    },
    Object {
        #[serde(default)]
        members: Vec<TypeMember>,
    },
    Array {
        element: Box<TypeRef>,
    },
    Tuple {
        elements: Vec<TypeRef>,
    },
    Union {
        types: Vec<TypeRef>,
    },
    Intersection {
        types: Vec<TypeRef>,
    },
    Function {
        #[serde(default)]
        params: Vec<TypeRef>,
        ret: Box<TypeRef>,
    },
}

impl TypeRef {
    pub fn named(name: impl Into<Name>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<Name>, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            name: name.into(),
            args,
        }
    }

    pub fn primitive(name: PrimitiveType) -> Self {
        TypeRef::Primitive { name }
    }

    pub fn object(members: Vec<TypeMember>) -> Self {
        TypeRef::Object { members }
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array {
            element: Box::new(element),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named { name, args } => {
                f.write_str(name)?;
                if !args.is_empty() {
                    f.write_str("<")?;
                    write_joined(f, args, ", ")?;
                    f.write_str(">")?;
                }
                Ok(())
            }
            TypeRef::Primitive { name } => f.write_str(name.keyword()),
            TypeRef::StringLiteral { value } => write!(f, "{value:?}"),
            TypeRef::NumberLiteral { value } => f.write_str(value),
            TypeRef::BooleanLiteral { value } => write!(f, "{value}"),
            TypeRef::Object { members } => {
                f.write_str("{ ")?;
                for member in members {
                    match member {
                        TypeMember::Property { name, optional, ty } => {
                            let mark = if *optional { "?" } else { "" };
                            write!(f, "{name}{mark}: {ty}; ")?;
                        }
                        TypeMember::Method { name, params, ret } => {
                            write!(f, "{name}(")?;
                            write_joined(f, params, ", ")?;
                            write!(f, "): {ret}; ")?;
                        }
                    }
                }
                f.write_str("}")
            }
            TypeRef::Array { element } => write!(f, "{element}[]"),
            TypeRef::Tuple { elements } => {
                f.write_str("[")?;
                write_joined(f, elements, ", ")?;
                f.write_str("]")
            }
            TypeRef::Union { types } => write_joined(f, types, " | "),
            TypeRef::Intersection { types } => write_joined(f, types, " & "),
            TypeRef::Function { params, ret } => {
                f.write_str("(")?;
                write_joined(f, params, ", ")?;
                write!(f, ") => {ret}")
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[TypeRef], sep: &str) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}
