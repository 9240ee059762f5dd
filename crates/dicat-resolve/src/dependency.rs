//! Required inputs of beans.

use std::collections::HashMap;
use std::path::Path;

use dicat_core::{Location, Name};
use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use dicat_model::{find_annotation, ParamDecl};
use dicat_types::{QualifyError, TypeIdentity, TypeQualifier};
use serde::Serialize;

use crate::{Bean, BeanId, BeanKind, ContextId, Qualifier};

pub const QUALIFIER_ANNOTATION: &str = "Qualifier";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    pub owner: BeanId,
    pub param_name: Name,
    pub identity: TypeIdentity,
    pub type_name: String,
    pub qualifier: Qualifier,
    pub location: Location,
}

/// Dependencies per bean, in parameter declaration order.
#[derive(Debug, Default)]
pub struct DependencyRegistry {
    by_bean: HashMap<BeanId, Vec<Dependency>>,
}

impl DependencyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the parameters of a method bean as its dependencies.
    ///
    /// Field beans get an empty list here; their dependencies are the
    /// constructor parameters of the provider class, registered with
    /// [`DependencyRegistry::register_constructor_dependencies`] once the
    /// constructor reference is resolved.
    pub fn register_dependencies(
        &mut self,
        bean: &Bean,
        context_path: &Path,
        qualifier: &mut TypeQualifier<'_>,
        diagnostics: &mut CompilationDiagnostics,
    ) -> &[Dependency] {
        let dependencies = match &bean.kind {
            BeanKind::Method { params } => {
                collect(bean.id, params, context_path, context_path, qualifier, diagnostics)
            }
            BeanKind::Field { .. } => Vec::new(),
        };
        self.insert(bean.id, dependencies)
    }

    /// Registers constructor parameters declared in `class_path` as the
    /// dependencies of a field bean of the context at `context_path`.
    pub fn register_constructor_dependencies(
        &mut self,
        bean: &Bean,
        params: &[ParamDecl],
        class_path: &Path,
        context_path: &Path,
        qualifier: &mut TypeQualifier<'_>,
        diagnostics: &mut CompilationDiagnostics,
    ) -> &[Dependency] {
        let dependencies = collect(
            bean.id,
            params,
            class_path,
            context_path,
            qualifier,
            diagnostics,
        );
        self.insert(bean.id, dependencies)
    }

    fn insert(&mut self, bean: BeanId, dependencies: Vec<Dependency>) -> &[Dependency] {
        tracing::trace!(
            target: "dicat.resolve",
            bean = ?bean,
            dependencies = dependencies.len(),
            "registered dependencies"
        );
        let slot = self.by_bean.entry(bean).or_default();
        *slot = dependencies;
        slot.as_slice()
    }

    pub fn dependencies(&self, bean: BeanId) -> &[Dependency] {
        self.by_bean
            .get(&bean)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, bean: BeanId, index: usize) -> Option<&Dependency> {
        self.by_bean.get(&bean)?.get(index)
    }

    pub fn clear_context(&mut self, context: ContextId) {
        self.by_bean.retain(|bean, _| bean.context != context);
    }

    pub fn len(&self) -> usize {
        self.by_bean.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_bean.clear();
    }
}

fn collect(
    owner: BeanId,
    params: &[ParamDecl],
    declared_in: &Path,
    context_path: &Path,
    qualifier: &mut TypeQualifier<'_>,
    diagnostics: &mut CompilationDiagnostics,
) -> Vec<Dependency> {
    params
        .iter()
        .filter_map(|param| {
            let location = Location::new(declared_in, param.range);
            let report = |diagnostics: &mut CompilationDiagnostics, kind, message: String| {
                diagnostics.report(
                    CompilationError::new(kind, Phase::Resolution, context_path, message)
                        .at(location.clone()),
                );
            };

            let requested = match find_annotation(&param.annotations, QUALIFIER_ANNOTATION) {
                Some(annotation) => match annotation.string_arg() {
                    Some(value) => Qualifier::from_literal(value),
                    None => {
                        report(
                            diagnostics,
                            ErrorKind::InvalidBeanOptions,
                            "Qualifier should have a string literal argument".to_string(),
                        );
                        Qualifier::Default
                    }
                },
                None => Qualifier::Default,
            };

            let identity = match qualifier.qualify(declared_in, param.ty.as_ref()) {
                Ok(identity) => identity,
                Err(err) => {
                    let (kind, message) = match err {
                        QualifyError::HasNoType => (
                            ErrorKind::HasNoType,
                            format!("Dependency `{}` should have a type", param.name),
                        ),
                        QualifyError::TypeIsPrimitive { ty } => (
                            ErrorKind::TypeIsPrimitive,
                            format!(
                                "Dependency `{}` should have complex type \
                                 (interfaces, ...etc), found {ty}",
                                param.name
                            ),
                        ),
                        other => (
                            ErrorKind::CannotQualifyDependency,
                            format!("Can't qualify type of dependency `{}`: {other}", param.name),
                        ),
                    };
                    report(diagnostics, kind, message);
                    return None;
                }
            };

            Some(Dependency {
                owner,
                param_name: param.name.clone(),
                identity,
                type_name: param.ty.as_ref().map(ToString::to_string).unwrap_or_default(),
                qualifier: requested,
                location,
            })
        })
        .collect()
}
