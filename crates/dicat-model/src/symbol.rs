//! Name lookup across files: local declarations, imports and re-export chains.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use dicat_core::Name;

use crate::{Declaration, Export, Import, SourceFile};

/// Query interface over the host compiler's view of the program.
///
/// The model is immutable for the duration of a compilation pass; callers may
/// cache anything derived from it until the next pass starts.
pub trait SourceModel {
    fn file(&self, path: &Path) -> Option<&SourceFile>;

    /// All files, ordered by path.
    fn files(&self) -> Vec<&SourceFile>;
}

/// A declaration together with the file that defines it.
#[derive(Debug, Clone, Copy)]
pub struct Symbol<'m> {
    pub file: &'m SourceFile,
    pub decl: &'m Declaration,
}

impl<'m> Symbol<'m> {
    pub fn path(&self) -> &'m Path {
        &self.file.path
    }
}

/// Resolves `name` as seen from `from` to its defining declaration.
///
/// `name` may be namespace-qualified (`ns.Foo`) when `ns` is a namespace import.
/// Import and re-export chains are followed until the declaration is found;
/// cyclic re-exports resolve to `None`.
pub fn resolve_symbol<'m>(
    model: &'m dyn SourceModel,
    from: &Path,
    name: &str,
) -> Option<Symbol<'m>> {
    let file = model.file(from)?;

    if let Some((namespace, rest)) = name.split_once('.') {
        let target = file.imports.iter().find_map(|import| match import {
            Import::Namespace { local, from } if local == namespace => Some(from.as_path()),
            _ => None,
        })?;
        return resolve_symbol(model, target, rest);
    }

    if let Some(decl) = file.declaration(name) {
        return Some(Symbol { file, decl });
    }

    for import in &file.imports {
        if let Import::Named {
            local,
            imported,
            from,
        } = import
        {
            if local == name {
                let mut visited = HashSet::new();
                return resolve_export(model, from, imported, &mut visited);
            }
        }
    }

    None
}

/// Resolves an exported name of the file at `path`.
pub fn resolve_exported<'m>(
    model: &'m dyn SourceModel,
    path: &Path,
    exported: &str,
) -> Option<Symbol<'m>> {
    let mut visited = HashSet::new();
    resolve_export(model, path, exported, &mut visited)
}

fn resolve_export<'m>(
    model: &'m dyn SourceModel,
    path: &Path,
    exported: &str,
    visited: &mut HashSet<(PathBuf, Name)>,
) -> Option<Symbol<'m>> {
    if !visited.insert((path.to_path_buf(), Name::new(exported))) {
        return None;
    }

    let file = model.file(path)?;

    for export in &file.exports {
        match export {
            Export::Named {
                exported: alias,
                local,
                from: Some(from),
            } if alias == exported => {
                return resolve_export(model, from, local, visited);
            }
            Export::Named {
                exported: alias,
                local,
                from: None,
            } if alias == exported => {
                return resolve_local(model, file, local, visited);
            }
            _ => {}
        }
    }

    // Top-level declarations are visible under their own name.
    if let Some(decl) = file.declaration(exported) {
        return Some(Symbol { file, decl });
    }

    file.exports.iter().find_map(|export| match export {
        Export::All { from } => resolve_export(model, from, exported, visited),
        Export::Named { .. } => None,
    })
}

/// A local name inside `file`, which may itself be an import
/// (`import { A } ...; export { A as B }`).
fn resolve_local<'m>(
    model: &'m dyn SourceModel,
    file: &'m SourceFile,
    local: &str,
    visited: &mut HashSet<(PathBuf, Name)>,
) -> Option<Symbol<'m>> {
    if let Some(decl) = file.declaration(local) {
        return Some(Symbol { file, decl });
    }
    file.imports.iter().find_map(|import| match import {
        Import::Named {
            local: name,
            imported,
            from,
        } if name == local => resolve_export(model, from, imported, visited),
        _ => None,
    })
}
