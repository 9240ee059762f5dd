//! The dicat resolution engine.
//!
//! Resolution runs in two phases over a whole [`SourceModel`](dicat_model::SourceModel):
//!
//! 1. registration: every file is scanned for a configuration class
//!    ([`ContextRegistry`]) and its providers ([`BeanRegistry`])
//! 2. resolution: dependencies are extracted ([`DependencyRegistry`]), matched
//!    to providers ([`GraphResolver`]) and checked for cycles ([`detect_cycles`])
//!
//! [`Pipeline`] drives both phases over a [`CompilationSession`], which owns
//! every table. Problems in the user's program are collected in the session's
//! [`CompilationDiagnostics`](dicat_diagnostics::CompilationDiagnostics); only
//! broken registry invariants surface as [`ResolveError`].

mod bean;
mod container;
mod context;
mod cycles;
mod dependency;
mod error;
mod graph;
mod pipeline;
mod plan;
mod session;

pub use bean::{
    Bean, BeanId, BeanKind, BeanRegistry, Qualifier, Scope, BEAN_ANNOTATION, BEAN_FACTORY,
    PROTOTYPE_ANNOTATION, SINGLETON_ANNOTATION,
};
pub use container::{check_container_calls, VALID_ACCESSOR_METHODS};
pub use context::{
    Context, ContextId, ContextRegistry, CONTEXT_ANNOTATION, GLOBAL_CONTEXT_ANNOTATION,
    GLOBAL_CONTEXT_NAME,
};
pub use cycles::{detect_cycles, CycleReport};
pub use dependency::{Dependency, DependencyRegistry, QUALIFIER_ANNOTATION};
pub use error::ResolveError;
pub use graph::{DependencyGraph, GraphEdge, GraphResolver};
pub use pipeline::{Pipeline, RegisterSummary, ResolveSummary};
pub use plan::{BeanAccessor, BeanConstruction, BeanPlan, ContextPlan};
pub use session::CompilationSession;
