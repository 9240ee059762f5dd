//! Context discovery: which declarations are configuration units.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use dicat_config::ContextFilter;
use dicat_core::{Location, Name};
use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use dicat_model::{find_annotation, ClassDecl, SourceFile};
use serde::Serialize;

pub const CONTEXT_ANNOTATION: &str = "Context";
/// File-scoped marker: the context declared in the file is the global one.
pub const GLOBAL_CONTEXT_ANNOTATION: &str = "GlobalContext";
pub const GLOBAL_CONTEXT_NAME: &str = "Global";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ContextId(pub(crate) u32);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    pub id: ContextId,
    pub name: Name,
    pub source_path: PathBuf,
    pub is_global: bool,
    /// The configuration class.
    pub class_name: Name,
    pub location: Location,
}

/// Contexts of the session, keyed by source path.
///
/// Ids are stable per path: re-registering a path reuses its id.
#[derive(Debug, Default)]
pub struct ContextRegistry {
    slots: Vec<Option<Context>>,
    ids: HashMap<PathBuf, ContextId>,
    by_path: BTreeMap<PathBuf, ContextId>,
    by_name: HashMap<Name, ContextId>,
    global: Option<ContextId>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the configuration class of `file`, if it has one.
    ///
    /// Any context previously registered for the path must have been cleared.
    /// A second global context or a duplicate context name is reported and
    /// the file is skipped.
    pub fn register_context(
        &mut self,
        file: &SourceFile,
        filter: &ContextFilter,
        diagnostics: &mut CompilationDiagnostics,
    ) -> Option<ContextId> {
        let path = file.path();
        if !filter.accepts(path) {
            tracing::trace!(
                target: "dicat.resolve",
                path = %path.display(),
                "file excluded from context discovery"
            );
            return None;
        }

        let mut classes = file
            .classes()
            .filter(|class| class.has_annotation(CONTEXT_ANNOTATION));
        let class = classes.next()?;
        let class_location = Location::new(path, class.range);
        for extra in classes {
            diagnostics.report(
                CompilationError::new(
                    ErrorKind::MultipleContextsInFile,
                    Phase::Registration,
                    path,
                    format!(
                        "Only one context is allowed per file, `{}` is ignored",
                        extra.name
                    ),
                )
                .at(Location::new(path, extra.range))
                .involving(class_location.clone()),
            );
        }

        let is_global = file.has_annotation(GLOBAL_CONTEXT_ANNOTATION);
        let name = context_name(class, is_global);

        if is_global {
            if let Some(existing) = self.global() {
                diagnostics.report(
                    CompilationError::new(
                        ErrorKind::DuplicateGlobalContext,
                        Phase::Registration,
                        path,
                        "Global context is already declared",
                    )
                    .at(class_location)
                    .involving(existing.location.clone()),
                );
                return None;
            }
        } else if name == GLOBAL_CONTEXT_NAME {
            diagnostics.report(
                CompilationError::new(
                    ErrorKind::DuplicateContextName,
                    Phase::Registration,
                    path,
                    format!(
                        "Context name \"{GLOBAL_CONTEXT_NAME}\" is reserved for the global context"
                    ),
                )
                .at(class_location),
            );
            return None;
        }

        if let Some(existing) = self.by_name(&name) {
            diagnostics.report(
                CompilationError::new(
                    ErrorKind::DuplicateContextName,
                    Phase::Registration,
                    path,
                    format!("Context with name \"{name}\" is already declared"),
                )
                .with_nodes([existing.location.clone(), class_location])
                .involving(existing.location.clone()),
            );
            return None;
        }

        let id = self.allocate(path);
        let context = Context {
            id,
            name: name.clone(),
            source_path: path.to_path_buf(),
            is_global,
            class_name: class.name.clone(),
            location: class_location,
        };
        tracing::debug!(
            target: "dicat.resolve",
            path = %path.display(),
            context = %name,
            global = is_global,
            "registered context"
        );

        self.slots[id.0 as usize] = Some(context);
        self.by_path.insert(path.to_path_buf(), id);
        self.by_name.insert(name, id);
        if is_global {
            self.global = Some(id);
        }
        Some(id)
    }

    fn allocate(&mut self, path: &Path) -> ContextId {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }
        let id = ContextId(self.slots.len() as u32);
        self.slots.push(None);
        self.ids.insert(path.to_path_buf(), id);
        id
    }

    /// Removes the context registered for `path`, returning it.
    pub fn clear_by_path(&mut self, path: &Path) -> Option<Context> {
        let id = self.by_path.remove(path)?;
        let context = self.slots.get_mut(id.0 as usize)?.take()?;
        if self.by_name.get(&context.name) == Some(&id) {
            self.by_name.remove(&context.name);
        }
        if self.global == Some(id) {
            self.global = None;
        }
        Some(context)
    }

    pub fn get(&self, id: ContextId) -> Option<&Context> {
        self.slots.get(id.0 as usize)?.as_ref()
    }

    pub fn by_path(&self, path: &Path) -> Option<&Context> {
        self.get(*self.by_path.get(path)?)
    }

    pub fn by_name(&self, name: &str) -> Option<&Context> {
        self.get(*self.by_name.get(name)?)
    }

    pub fn global(&self) -> Option<&Context> {
        self.get(self.global?)
    }

    /// Registered contexts in source path order.
    pub fn iter(&self) -> impl Iterator<Item = &Context> {
        self.by_path.values().filter_map(|id| self.get(*id))
    }

    pub fn ids(&self) -> Vec<ContextId> {
        self.by_path.values().copied().collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.by_path.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// The configuration class of a registered context.
pub(crate) fn context_class<'f>(file: &'f SourceFile, context: &Context) -> Option<&'f ClassDecl> {
    file.classes().find(|class| class.name == context.class_name)
}

fn context_name(class: &ClassDecl, is_global: bool) -> Name {
    if is_global {
        return Name::new(GLOBAL_CONTEXT_NAME);
    }
    find_annotation(&class.annotations, CONTEXT_ANNOTATION)
        .and_then(|annotation| annotation.string_arg())
        .map(Name::new)
        .unwrap_or_else(|| class.name.clone())
}
