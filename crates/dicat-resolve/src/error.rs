use thiserror::Error;

use crate::{BeanId, ContextId};

/// Broken registry invariants. These abort the compilation; problems in the
/// user's program are reported through `CompilationDiagnostics` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("context {0:?} disappeared between lookup and use")]
    ContextVanished(ContextId),
    #[error("bean {0:?} disappeared between lookup and use")]
    BeanVanished(BeanId),
    #[error("configuration class of context {0:?} is missing from its file")]
    ContextClassVanished(ContextId),
    #[error("bean {0:?} has no resolved constructor")]
    MissingConstructor(BeanId),
}
