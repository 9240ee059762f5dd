//! Core shared types for dicat.
//!
//! This crate is intentionally small: positions and locations shared by the
//! source model, the registries and the diagnostics sink.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Interned-ish identifier used for declaration, member and context names.
pub type Name = smol_str::SmolStr;

/// A zero-based position in a source file expressed as (line, column).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// A half-open range in a source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    #[inline]
    pub const fn point(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// A range in a specific file; every diagnostic node is reported as one of these.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: PathBuf,
    pub range: Range,
}

impl Location {
    pub fn new(file: impl Into<PathBuf>, range: Range) -> Self {
        Self {
            file: file.into(),
            range,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    /// One-based `(line, column)` of the start of the range, as shown to users.
    pub fn line_col(&self) -> (u32, u32) {
        (
            self.range.start.line.saturating_add(1),
            self.range.start.character.saturating_add(1),
        )
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (line, col) = self.line_col();
        write!(f, "{}:{}:{}", self.file.display(), line, col)
    }
}
