//! The compilation diagnostics sink.
//!
//! Problems in the user's program are never Rust errors: every registry and
//! the resolver record them here and keep going, so that one pass surfaces the
//! complete set. The host reads the sink to decide success and renders it with
//! [`CompilationDiagnostics::error_message`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use dicat_core::Location;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod render;

pub use render::{DebugError, DebugErrorWithMultipleNodes, DebugNode, DebugReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ErrorKind {
    HasNoType,
    TypeIsPrimitive,
    ExplicitTypeMismatch,
    CannotQualifyBean,
    CannotQualifyDependency,
    InvalidBeanOptions,
    UnresolvedConstructor,
    AmbiguousBean,
    UnresolvedDependency,
    AmbiguousDependency,
    GlobalContextSelfAccess,
    GlobalContextAccess,
    CyclicDependency,
    DuplicateGlobalContext,
    DuplicateContextName,
    MultipleContextsInFile,
    ContextNotFound,
    InvalidAccessorMethod,
}

impl ErrorKind {
    pub const fn code(self) -> &'static str {
        match self {
            ErrorKind::HasNoType => "DICAT_HAS_NO_TYPE",
            ErrorKind::TypeIsPrimitive => "DICAT_TYPE_IS_PRIMITIVE",
            ErrorKind::ExplicitTypeMismatch => "DICAT_EXPLICIT_TYPE_MISMATCH",
            ErrorKind::CannotQualifyBean => "DICAT_CANNOT_QUALIFY_BEAN",
            ErrorKind::CannotQualifyDependency => "DICAT_CANNOT_QUALIFY_DEPENDENCY",
            ErrorKind::InvalidBeanOptions => "DICAT_INVALID_BEAN_OPTIONS",
            ErrorKind::UnresolvedConstructor => "DICAT_UNRESOLVED_CONSTRUCTOR",
            ErrorKind::AmbiguousBean => "DICAT_AMBIGUOUS_BEAN",
            ErrorKind::UnresolvedDependency => "DICAT_UNRESOLVED_DEPENDENCY",
            ErrorKind::AmbiguousDependency => "DICAT_AMBIGUOUS_DEPENDENCY",
            ErrorKind::GlobalContextSelfAccess => "DICAT_GLOBAL_CONTEXT_SELF_ACCESS",
            ErrorKind::GlobalContextAccess => "DICAT_GLOBAL_CONTEXT_ACCESS",
            ErrorKind::CyclicDependency => "DICAT_CYCLIC_DEPENDENCY",
            ErrorKind::DuplicateGlobalContext => "DICAT_DUPLICATE_GLOBAL_CONTEXT",
            ErrorKind::DuplicateContextName => "DICAT_DUPLICATE_CONTEXT_NAME",
            ErrorKind::MultipleContextsInFile => "DICAT_MULTIPLE_CONTEXTS_IN_FILE",
            ErrorKind::ContextNotFound => "DICAT_CONTEXT_NOT_FOUND",
            ErrorKind::InvalidAccessorMethod => "DICAT_INVALID_ACCESSOR_METHOD",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// The pipeline phase that produced a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Context and bean registration; scoped to the file being registered.
    Registration,
    /// Dependency matching, cycle detection and accessor checks.
    Resolution,
}

/// One reported problem.
///
/// `nodes` decides how it is rendered: no node is a text error, one node a
/// single-location error and more than one a multi-location error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationError {
    pub kind: ErrorKind,
    pub message: String,
    /// The file whose (re-)processing owns this diagnostic.
    pub scope: PathBuf,
    pub phase: Phase,
    pub nodes: Vec<Location>,
    /// Declaration of a second context the error refers to.
    pub related_context: Option<Location>,
}

impl CompilationError {
    pub fn new(
        kind: ErrorKind,
        phase: Phase,
        scope: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            scope: scope.into(),
            phase,
            nodes: Vec::new(),
            related_context: None,
        }
    }

    pub fn at(mut self, node: Location) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = Location>) -> Self {
        self.nodes.extend(nodes);
        self
    }

    pub fn involving(mut self, context: Location) -> Self {
        self.related_context = Some(context);
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// How [`CompilationDiagnostics::error_message`] renders the sink.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ErrorMessageMode {
    /// A single formatted block for terminals.
    #[default]
    Human,
    /// A JSON record for tooling.
    Debug,
}

impl fmt::Display for ErrorMessageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorMessageMode::Human => f.write_str("human"),
            ErrorMessageMode::Debug => f.write_str("debug"),
        }
    }
}

impl FromStr for ErrorMessageMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(ErrorMessageMode::Human),
            "debug" => Ok(ErrorMessageMode::Debug),
            other => Err(format!(
                "unknown error message mode `{other}` (expected `human` or `debug`)"
            )),
        }
    }
}

/// Session-wide, file-scoped sink for compilation errors.
#[derive(Debug, Clone, Default)]
pub struct CompilationDiagnostics {
    errors: Vec<CompilationError>,
}

impl CompilationDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: CompilationError) {
        tracing::debug!(
            target: "dicat.diagnostics",
            code = error.code(),
            scope = %error.scope.display(),
            nodes = error.nodes.len(),
            "{}",
            error.message
        );
        self.errors.push(error);
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompilationError> {
        self.errors.iter()
    }

    pub fn of_kind(&self, kind: ErrorKind) -> impl Iterator<Item = &CompilationError> {
        self.errors.iter().filter(move |error| error.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Removes every diagnostic scoped to `path`.
    pub fn clear_by_path(&mut self, path: &Path) {
        self.errors.retain(|error| error.scope != path);
    }

    pub fn clear_phase(&mut self, phase: Phase) {
        self.errors.retain(|error| error.phase != phase);
    }

    pub fn clear_path_phase(&mut self, path: &Path, phase: Phase) {
        self.errors
            .retain(|error| error.scope != path || error.phase != phase);
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    /// Renders the sink, or `None` when there is nothing to report.
    pub fn error_message(
        &self,
        mode: ErrorMessageMode,
    ) -> Result<Option<String>, serde_json::Error> {
        if self.is_empty() {
            return Ok(None);
        }
        match mode {
            ErrorMessageMode::Human => Ok(Some(render::human(&self.errors))),
            ErrorMessageMode::Debug => serde_json::to_string(&self.debug_report()).map(Some),
        }
    }

    pub fn debug_report(&self) -> DebugReport {
        render::debug(&self.errors)
    }
}
