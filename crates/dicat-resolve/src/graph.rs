//! Dependency matching.

use dicat_core::Location;
use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use dicat_model::{resolve_symbol, Declaration, SourceModel};
use dicat_types::TypeQualifier;
use serde::Serialize;

use crate::{
    Bean, BeanId, BeanKind, BeanRegistry, Context, ContextId, ContextRegistry, Dependency,
    DependencyRegistry, ResolveError,
};

/// A resolved dependency: the `dependency`-th dependency of the owning bean
/// is provided by `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct GraphEdge {
    pub dependency: usize,
    pub target: BeanId,
}

/// The resolved links of one context.
///
/// Nodes are the context's beans, addressed by [`BeanId::index`]; edges keep
/// parameter declaration order and may target beans of the global context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    pub context: ContextId,
    edges: Vec<Vec<GraphEdge>>,
}

impl DependencyGraph {
    pub fn new(context: ContextId, nodes: usize) -> Self {
        Self {
            context,
            edges: vec![Vec::new(); nodes],
        }
    }

    pub fn node_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Outgoing edges of the bean at `index`.
    pub fn edges(&self, index: u32) -> &[GraphEdge] {
        self.edges
            .get(index as usize)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn add_edge(&mut self, from: u32, edge: GraphEdge) {
        if let Some(edges) = self.edges.get_mut(from as usize) {
            edges.push(edge);
        }
    }

    /// `(owner, edges)` for every node.
    pub fn iter(&self) -> impl Iterator<Item = (BeanId, &[GraphEdge])> {
        let context = self.context;
        self.edges.iter().enumerate().map(move |(index, edges)| {
            (
                BeanId {
                    context,
                    index: index as u32,
                },
                edges.as_slice(),
            )
        })
    }

    /// Drops every edge pointing into `context`.
    pub fn remove_edges_into(&mut self, context: ContextId) {
        for edges in &mut self.edges {
            edges.retain(|edge| edge.target.context != context);
        }
    }
}

/// Matches dependencies of one context to providers.
///
/// Lookup is local first, then the global context; beans of other contexts
/// are never candidates.
pub struct GraphResolver<'a, 'm> {
    pub model: &'m dyn SourceModel,
    pub contexts: &'a ContextRegistry,
    pub beans: &'a BeanRegistry,
    pub dependencies: &'a mut DependencyRegistry,
    pub qualifier: &'a mut TypeQualifier<'m>,
    pub diagnostics: &'a mut CompilationDiagnostics,
}

impl<'a> GraphResolver<'a, '_> {
    /// Registers the dependencies of every bean of `id` and resolves them.
    pub fn resolve(&mut self, id: ContextId) -> Result<DependencyGraph, ResolveError> {
        let contexts = self.contexts;
        let context = contexts
            .get(id)
            .ok_or(ResolveError::ContextVanished(id))?;
        let _span = tracing::debug_span!(
            "phase",
            name = "resolve_context",
            context = %context.name
        )
        .entered();

        let registry = self.beans;
        let beans = registry.beans(id);
        let mut graph = DependencyGraph::new(id, beans.len());
        for bean in beans {
            let dependencies = self.register_dependencies(context, bean);
            for (index, dependency) in dependencies.iter().enumerate() {
                if let Some(target) = self.match_dependency(context, bean, dependency) {
                    graph.add_edge(
                        bean.id.index,
                        GraphEdge {
                            dependency: index,
                            target,
                        },
                    );
                }
            }
        }

        tracing::debug!(
            target: "dicat.resolve",
            context = %context.name,
            beans = graph.node_count(),
            edges = graph.edge_count(),
            "resolved context"
        );
        Ok(graph)
    }

    fn register_dependencies(&mut self, context: &Context, bean: &Bean) -> Vec<Dependency> {
        let path = context.source_path.as_path();
        let BeanKind::Field {
            constructor,
            constructor_range,
        } = &bean.kind
        else {
            return self
                .dependencies
                .register_dependencies(bean, path, self.qualifier, self.diagnostics)
                .to_vec();
        };

        let model = self.model;
        let class = constructor.as_ref().and_then(|name| {
            let symbol = resolve_symbol(model, path, name)?;
            match symbol.decl {
                Declaration::Class(class) => Some((symbol.path(), class)),
                Declaration::Interface(_) | Declaration::TypeAlias(_) => None,
            }
        });
        let Some((class_path, class)) = class else {
            let message = match constructor {
                Some(name) => {
                    format!("Can't resolve `{name}` to a class, Bean can't be constructed")
                }
                None => "First argument in Property-Bean should be a reference".to_string(),
            };
            self.diagnostics.report(
                CompilationError::new(
                    ErrorKind::UnresolvedConstructor,
                    Phase::Resolution,
                    path,
                    message,
                )
                .at(Location::new(path, *constructor_range)),
            );
            return self
                .dependencies
                .register_constructor_dependencies(
                    bean,
                    &[],
                    path,
                    path,
                    self.qualifier,
                    self.diagnostics,
                )
                .to_vec();
        };

        let params = class
            .constructor
            .as_ref()
            .map(|ctor| ctor.params.as_slice())
            .unwrap_or_default();
        self.dependencies
            .register_constructor_dependencies(
                bean,
                params,
                class_path,
                path,
                self.qualifier,
                self.diagnostics,
            )
            .to_vec()
    }

    fn match_dependency(
        &mut self,
        context: &Context,
        bean: &Bean,
        dependency: &Dependency,
    ) -> Option<BeanId> {
        let beans: &'a BeanRegistry = self.beans;
        let contexts: &'a ContextRegistry = self.contexts;
        let mut candidates: Vec<&Bean> = beans
            .find(context.id, &dependency.identity, &dependency.qualifier)
            .collect();
        let mut searched_global = None;

        if context.is_global {
            if candidates.iter().any(|candidate| candidate.id == bean.id) {
                self.report(
                    context,
                    CompilationError::new(
                        ErrorKind::GlobalContextSelfAccess,
                        Phase::Resolution,
                        &context.source_path,
                        format!(
                            "Bean `{}` of the Global context can't depend on itself",
                            bean.member_name
                        ),
                    )
                    .at(dependency.location.clone()),
                );
                return None;
            }
        } else if candidates.is_empty() {
            if let Some(global) = contexts.global() {
                candidates = beans
                    .find(global.id, &dependency.identity, &dependency.qualifier)
                    .collect();
                searched_global = Some(global);
            }
        }

        match candidates.as_slice() {
            [] => {
                let mut error = CompilationError::new(
                    ErrorKind::UnresolvedDependency,
                    Phase::Resolution,
                    &context.source_path,
                    format!(
                        "Bean for dependency `{}` of type {} \
                         with qualifier \"{}\" is not registered",
                        dependency.param_name, dependency.type_name, dependency.qualifier
                    ),
                )
                .at(dependency.location.clone());
                if let Some(global) = searched_global {
                    error = error.involving(global.location.clone());
                }
                self.report(context, error);
                None
            }
            [target] => {
                tracing::trace!(
                    target: "dicat.resolve",
                    bean = %bean.member_name,
                    dependency = %dependency.param_name,
                    provider = %target.member_name,
                    "resolved dependency"
                );
                Some(target.id)
            }
            several => {
                let mut error = CompilationError::new(
                    ErrorKind::AmbiguousDependency,
                    Phase::Resolution,
                    &context.source_path,
                    format!(
                        "Found {} Beans for dependency `{}` of type {} with qualifier \"{}\"",
                        several.len(),
                        dependency.param_name,
                        dependency.type_name,
                        dependency.qualifier
                    ),
                )
                .at(dependency.location.clone())
                .with_nodes(several.iter().map(|candidate| candidate.location.clone()));
                if let Some(global) = searched_global {
                    error = error.involving(global.location.clone());
                }
                self.report(context, error);
                None
            }
        }
    }

    fn report(&mut self, context: &Context, error: CompilationError) {
        tracing::trace!(
            target: "dicat.resolve",
            context = %context.name,
            code = error.code(),
            "dependency not resolved"
        );
        self.diagnostics.report(error);
    }
}
