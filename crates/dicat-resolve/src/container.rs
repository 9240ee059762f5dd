//! Checks of runtime accessor call sites (`container.get("Name")`).

use dicat_core::Location;
use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use dicat_model::SourceFile;

use crate::{ContextRegistry, GLOBAL_CONTEXT_NAME};

/// Methods the accessor facade exposes.
pub const VALID_ACCESSOR_METHODS: &[&str] = &["get"];

/// Validates every accessor call recorded for `file` against the registered
/// contexts. Calls with a non-literal context argument are not checked.
pub fn check_container_calls(
    file: &SourceFile,
    contexts: &ContextRegistry,
    diagnostics: &mut CompilationDiagnostics,
) {
    let path = file.path();
    for call in &file.container_calls {
        let location = Location::new(path, call.range);

        if !VALID_ACCESSOR_METHODS.contains(&call.method.as_str()) {
            diagnostics.report(
                CompilationError::new(
                    ErrorKind::InvalidAccessorMethod,
                    Phase::Resolution,
                    path,
                    format!(
                        "Container has only following methods: {}",
                        VALID_ACCESSOR_METHODS.join(", ")
                    ),
                )
                .at(location),
            );
            continue;
        }

        let Some(name) = &call.context else {
            continue;
        };

        if name == GLOBAL_CONTEXT_NAME {
            diagnostics.report(CompilationError::new(
                ErrorKind::GlobalContextAccess,
                Phase::Resolution,
                path,
                "You can't access Global Context",
            ));
            continue;
        }

        if contexts.by_name(name).is_none() {
            diagnostics.report(
                CompilationError::new(
                    ErrorKind::ContextNotFound,
                    Phase::Resolution,
                    path,
                    format!("Context with name \"{name}\" not found"),
                )
                .at(location),
            );
        }
    }
}
