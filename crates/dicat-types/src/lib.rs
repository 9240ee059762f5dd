//! Canonical structural type identities.
//!
//! [`TypeQualifier`] turns a [`TypeRef`](dicat_model::TypeRef) written somewhere
//! in the program into a [`TypeIdentity`]: a canonical string describing the
//! *shape* of the type. Named references are looked up through the declaring
//! file's scope and expanded, so aliases, re-exports and member order never
//! influence the key.
//!
//! Encoding:
//! - primitives use their keyword, string literals are quoted and number
//!   literals are prefixed with `#`
//! - objects, interfaces and class instances are `{m1;m2}` with members sorted
//!   by name; properties are `"name":T` or `"name"?:T`, methods `"name"(A,B):R`
//! - `T[]`, `[A,B]` and `(fn(A,B)=>R)`
//! - unions `(A|B)` and intersections `(A&B)` are flattened, sorted and
//!   deduplicated; a set left with a single arm is that arm
//! - a reference back into an enclosing node is `^n`, where `n` counts the
//!   enclosing nodes between the reference and the node it re-enters
//!
//! Equivalent nodes are merged before encoding, so a recursive type written
//! out one level deeper (`{ x: A }` for `interface A { x: A }`) has the same
//! identity as the type itself.

use std::fmt;

use dicat_core::Name;
use serde::Serialize;
use thiserror::Error;

mod graph;
mod qualifier;

pub use qualifier::TypeQualifier;

/// Opaque, comparable key for a structurally resolved type.
///
/// Only [`TypeQualifier`] produces identities, so a raw string (a qualifier,
/// a member name) can never be confused with one.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TypeIdentity(String);

impl TypeIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeIdentity({})", self.0)
    }
}

impl fmt::Display for TypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QualifyError {
    #[error("type is not declared")]
    HasNoType,
    #[error("`{ty}` is a primitive type")]
    TypeIsPrimitive { ty: String },
    #[error("cannot find type `{name}`")]
    UnresolvedType { name: Name },
    #[error("type `{name}` expects {expected} type argument(s), found {found}")]
    TypeArgumentCount {
        name: Name,
        expected: usize,
        found: usize,
    },
    #[error("type `{name}` is defined in terms of itself")]
    CircularType { name: Name },
    #[error("`{ty}` cannot be extended")]
    InvalidBase { ty: String },
    #[error("expansion of `{name}` is too deep")]
    ExpansionTooDeep { name: Name },
}
