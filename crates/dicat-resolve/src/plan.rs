//! Construction plans handed to code generation.

use std::path::PathBuf;

use dicat_core::Name;
use serde::Serialize;

use crate::{BeanKind, CompilationSession, Qualifier, ResolveError, Scope};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextPlan {
    pub name: Name,
    pub class_name: Name,
    pub source_path: PathBuf,
    pub is_global: bool,
    pub beans: Vec<BeanPlan>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BeanPlan {
    pub member: Name,
    pub scope: Scope,
    pub qualifier: Qualifier,
    pub construction: BeanConstruction,
    /// One accessor per dependency, in parameter order.
    pub args: Vec<BeanAccessor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BeanConstruction {
    /// Call the configuration method with `args`.
    Method,
    /// `new class(...args)`.
    Constructor { class: Name },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BeanAccessor {
    /// A bean of the same context.
    Local { member: Name },
    /// A bean of the global context.
    Global { context: Name, member: Name },
}

/// Plans for every context of a resolved session, in source path order.
pub(crate) fn build_plans(session: &CompilationSession) -> Result<Vec<ContextPlan>, ResolveError> {
    let mut plans = Vec::new();
    for context in session.contexts.iter() {
        let graph = session
            .graphs
            .get(&context.id)
            .ok_or(ResolveError::ContextVanished(context.id))?;

        let mut beans = Vec::new();
        for bean in session.beans.beans(context.id) {
            let construction = match &bean.kind {
                BeanKind::Method { .. } => BeanConstruction::Method,
                BeanKind::Field {
                    constructor: Some(class),
                    ..
                } => BeanConstruction::Constructor {
                    class: class.clone(),
                },
                BeanKind::Field {
                    constructor: None, ..
                } => return Err(ResolveError::MissingConstructor(bean.id)),
            };

            let mut args = Vec::new();
            for edge in graph.edges(bean.id.index) {
                let target = session
                    .beans
                    .get(edge.target)
                    .ok_or(ResolveError::BeanVanished(edge.target))?;
                let accessor = if edge.target.context == context.id {
                    BeanAccessor::Local {
                        member: target.member_name.clone(),
                    }
                } else {
                    let owner = session
                        .contexts
                        .get(edge.target.context)
                        .ok_or(ResolveError::ContextVanished(edge.target.context))?;
                    BeanAccessor::Global {
                        context: owner.name.clone(),
                        member: target.member_name.clone(),
                    }
                };
                args.push(accessor);
            }

            beans.push(BeanPlan {
                member: bean.member_name.clone(),
                scope: bean.scope,
                qualifier: bean.qualifier.clone(),
                construction,
                args,
            });
        }

        plans.push(ContextPlan {
            name: context.name.clone(),
            class_name: context.class_name.clone(),
            source_path: context.source_path.clone(),
            is_global: context.is_global,
            beans,
        });
    }
    Ok(plans)
}
