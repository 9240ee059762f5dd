use std::collections::BTreeMap;
use std::path::Path;

use dicat_diagnostics::{CompilationDiagnostics, Phase};

use crate::{
    BeanRegistry, Context, ContextId, ContextRegistry, CycleReport, DependencyGraph,
    DependencyRegistry,
};

/// Every table of one compilation.
///
/// The session is passed explicitly through the pipeline; nothing is kept in
/// statics, so independent sessions never observe each other.
#[derive(Debug, Default)]
pub struct CompilationSession {
    pub(crate) contexts: ContextRegistry,
    pub(crate) beans: BeanRegistry,
    pub(crate) dependencies: DependencyRegistry,
    pub(crate) graphs: BTreeMap<ContextId, DependencyGraph>,
    pub(crate) cycles: Vec<CycleReport>,
    pub(crate) diagnostics: CompilationDiagnostics,
    /// Whether graphs reflect the current registrations.
    pub(crate) resolved: bool,
}

impl CompilationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contexts(&self) -> &ContextRegistry {
        &self.contexts
    }

    pub fn beans(&self) -> &BeanRegistry {
        &self.beans
    }

    pub fn dependencies(&self) -> &DependencyRegistry {
        &self.dependencies
    }

    pub fn graph(&self, context: ContextId) -> Option<&DependencyGraph> {
        self.graphs.get(&context)
    }

    pub fn graphs(&self) -> impl Iterator<Item = &DependencyGraph> {
        self.graphs.values()
    }

    pub fn cycles(&self) -> &[CycleReport] {
        &self.cycles
    }

    pub fn diagnostics(&self) -> &CompilationDiagnostics {
        &self.diagnostics
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Removes everything derived from `path`: its context, the context's
    /// beans, dependencies and graph, edges of other graphs into it, and the
    /// registration diagnostics of the file.
    ///
    /// Resolution results are stale afterwards until the next resolve.
    pub fn clear_by_path(&mut self, path: &Path) -> Option<Context> {
        self.diagnostics.clear_path_phase(path, Phase::Registration);
        self.resolved = false;

        let context = self.contexts.clear_by_path(path)?;
        self.beans.clear_context(context.id);
        self.dependencies.clear_context(context.id);
        self.graphs.remove(&context.id);
        for graph in self.graphs.values_mut() {
            graph.remove_edges_into(context.id);
        }
        self.cycles.retain(|cycle| cycle.context != context.id);

        tracing::debug!(
            target: "dicat.resolve",
            path = %path.display(),
            context = %context.name,
            "cleared context"
        );
        Some(context)
    }

    /// Drops every table, as when a new compilation starts.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
