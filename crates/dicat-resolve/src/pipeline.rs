//! The two-phase compilation pipeline.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use dicat_config::{ConfigError, ContextFilter, DicatConfig};
use dicat_diagnostics::{ErrorMessageMode, Phase};
use dicat_model::{SourceFile, SourceModel};
use dicat_types::TypeQualifier;
use serde::Serialize;

use crate::context::context_class;
use crate::cycles::report_cycles;
use crate::plan::build_plans;
use crate::{
    check_container_calls, detect_cycles, CompilationSession, Context, ContextId, ContextPlan,
    GraphResolver, ResolveError,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RegisterSummary {
    pub contexts: usize,
    pub beans: usize,
    /// Contexts purged because their file left the model.
    pub removed: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveSummary {
    pub contexts: usize,
    pub dependencies: usize,
    pub edges: usize,
    pub cycles: usize,
    /// Diagnostics in the session after resolution, both phases.
    pub errors: usize,
}

/// Drives registration and resolution over a [`CompilationSession`].
///
/// Both steps are idempotent and keyed by source path: registering a path
/// first clears everything previously derived from it, and resolving
/// recomputes every graph from the current registrations.
#[derive(Debug, Default)]
pub struct Pipeline {
    session: CompilationSession,
    filter: ContextFilter,
}

impl Pipeline {
    pub fn new(filter: ContextFilter) -> Self {
        Self {
            session: CompilationSession::new(),
            filter,
        }
    }

    pub fn with_config(config: &DicatConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.contexts.filter()?))
    }

    pub fn session(&self) -> &CompilationSession {
        &self.session
    }

    /// Phase 1: registers the context and beans of every file of `model`.
    ///
    /// Every earlier registration is cleared first, so the result depends only
    /// on `model`. Contexts whose file is no longer part of the model are
    /// reported as removed.
    pub fn register_all(
        &mut self,
        model: &dyn SourceModel,
    ) -> Result<RegisterSummary, ResolveError> {
        let _span = tracing::debug_span!("phase", name = "register_all").entered();

        let files = model.files();
        let present: BTreeSet<&Path> = files.iter().copied().map(SourceFile::path).collect();

        // Every registration is dropped up front so that name clashes are
        // decided by path order alone, never by what an earlier run kept.
        let registered: Vec<PathBuf> = self
            .session
            .contexts
            .paths()
            .map(Path::to_path_buf)
            .collect();
        let mut summary = RegisterSummary {
            removed: registered
                .iter()
                .filter(|path| !present.contains(path.as_path()))
                .count(),
            ..RegisterSummary::default()
        };
        for path in &registered {
            self.session.clear_by_path(path);
        }
        self.session.diagnostics.clear_phase(Phase::Registration);

        let mut qualifier = TypeQualifier::new(model);
        for file in files {
            if let Some(id) = self.register_file(file, &mut qualifier)? {
                summary.contexts += 1;
                summary.beans += self.session.beans.beans(id).len();
            }
        }

        tracing::debug!(
            target: "dicat.resolve",
            contexts = summary.contexts,
            beans = summary.beans,
            removed = summary.removed,
            "registration finished"
        );
        Ok(summary)
    }

    /// Re-registers a single path; a path missing from `model` is removed.
    pub fn register_path(
        &mut self,
        model: &dyn SourceModel,
        path: &Path,
    ) -> Result<Option<ContextId>, ResolveError> {
        let Some(file) = model.file(path) else {
            self.remove_path(path);
            return Ok(None);
        };
        let mut qualifier = TypeQualifier::new(model);
        self.register_file(file, &mut qualifier)
    }

    /// Forgets everything derived from `path`.
    pub fn remove_path(&mut self, path: &Path) -> Option<Context> {
        self.session.clear_by_path(path)
    }

    fn register_file(
        &mut self,
        file: &SourceFile,
        qualifier: &mut TypeQualifier<'_>,
    ) -> Result<Option<ContextId>, ResolveError> {
        let session = &mut self.session;
        session.clear_by_path(file.path());

        let Some(id) = session
            .contexts
            .register_context(file, &self.filter, &mut session.diagnostics)
        else {
            return Ok(None);
        };
        let context = session
            .contexts
            .get(id)
            .ok_or(ResolveError::ContextVanished(id))?;
        let class = context_class(file, context).ok_or(ResolveError::ContextClassVanished(id))?;

        session
            .beans
            .register_beans(context, class, qualifier, &mut session.diagnostics);
        Ok(Some(id))
    }

    /// Phase 2: dependencies, graphs, cycles and accessor checks for every
    /// registered context.
    pub fn resolve_all(
        &mut self,
        model: &dyn SourceModel,
    ) -> Result<ResolveSummary, ResolveError> {
        let _span = tracing::debug_span!("phase", name = "resolve_all").entered();

        let session = &mut self.session;
        session.diagnostics.clear_phase(Phase::Resolution);
        session.dependencies.clear();
        session.graphs.clear();
        session.cycles.clear();
        session.resolved = false;

        let mut qualifier = TypeQualifier::new(model);
        for id in session.contexts.ids() {
            let graph = GraphResolver {
                model,
                contexts: &session.contexts,
                beans: &session.beans,
                dependencies: &mut session.dependencies,
                qualifier: &mut qualifier,
                diagnostics: &mut session.diagnostics,
            }
            .resolve(id)?;

            let context = session
                .contexts
                .get(id)
                .ok_or(ResolveError::ContextVanished(id))?;
            let cycles = detect_cycles(&graph);
            report_cycles(context, &cycles, &session.beans, &mut session.diagnostics);
            session.cycles.extend(cycles);
            session.graphs.insert(id, graph);
        }

        for file in model.files() {
            check_container_calls(file, &session.contexts, &mut session.diagnostics);
        }
        session.resolved = true;

        let summary = ResolveSummary {
            contexts: session.graphs.len(),
            dependencies: session.dependencies.len(),
            edges: session.graphs.values().map(|graph| graph.edge_count()).sum(),
            cycles: session.cycles.len(),
            errors: session.diagnostics.len(),
        };
        tracing::debug!(
            target: "dicat.resolve",
            contexts = summary.contexts,
            edges = summary.edges,
            cycles = summary.cycles,
            errors = summary.errors,
            "resolution finished"
        );
        Ok(summary)
    }

    /// Both phases over `model`.
    pub fn run(&mut self, model: &dyn SourceModel) -> Result<ResolveSummary, ResolveError> {
        self.register_all(model)?;
        self.resolve_all(model)
    }

    /// Codegen plans, or `None` while the session is unresolved or has errors.
    pub fn plans(&self) -> Result<Option<Vec<ContextPlan>>, ResolveError> {
        if !self.session.resolved || self.session.diagnostics.has_errors() {
            return Ok(None);
        }
        build_plans(&self.session).map(Some)
    }

    pub fn error_message(
        &self,
        mode: ErrorMessageMode,
    ) -> Result<Option<String>, serde_json::Error> {
        self.session.diagnostics.error_message(mode)
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }
}
