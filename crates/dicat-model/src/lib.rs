//! The source model consumed by the resolver.
//!
//! The host compiler owns parsing and type checking; this crate is the
//! boundary it hands over: declarations with their annotation metadata,
//! structural type references, imports/re-exports and source positions.
//! `MemorySourceModel` is the in-memory implementation, loadable from JSON.

mod decl;
mod memory;
mod symbol;
mod ty;

pub use decl::{
    find_annotation, has_annotation, Annotation, AnnotationArg, ClassDecl, ClassMember,
    ConstructorDecl, ContainerCall, Declaration, Export, Expr, FieldDecl, Import, InterfaceDecl,
    MethodDecl, ParamDecl, SourceFile, TypeAliasDecl,
};
pub use memory::{MemorySourceModel, ModelError};
pub use symbol::{resolve_exported, resolve_symbol, SourceModel, Symbol};
pub use ty::{PrimitiveType, TypeMember, TypeRef};
