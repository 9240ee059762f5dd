use dicat_core::Location;
use serde::Serialize;

use crate::CompilationError;

const HEADER: &str = "DI-CAT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugReport {
    pub errors: Vec<DebugError>,
    pub errors_with_multiple_nodes: Vec<DebugErrorWithMultipleNodes>,
    pub text_errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugError {
    pub code: &'static str,
    pub message: String,
    pub file: String,
    /// One-based `[line, column]`.
    pub position: [u32; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugErrorWithMultipleNodes {
    pub code: &'static str,
    pub message: String,
    pub nodes: Vec<DebugNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugNode {
    pub file: String,
    pub position: [u32; 2],
}

impl From<&Location> for DebugNode {
    fn from(loc: &Location) -> Self {
        let (line, col) = loc.line_col();
        Self {
            file: loc.file.display().to_string(),
            position: [line, col],
        }
    }
}

pub(crate) fn debug(errors: &[CompilationError]) -> DebugReport {
    let mut report = DebugReport {
        errors: Vec::new(),
        errors_with_multiple_nodes: Vec::new(),
        text_errors: Vec::new(),
    };

    for error in errors {
        match error.nodes.as_slice() {
            [] => report.text_errors.push(error.message.clone()),
            [node] => {
                let node = DebugNode::from(node);
                report.errors.push(DebugError {
                    code: error.code(),
                    message: error.message.clone(),
                    file: node.file,
                    position: node.position,
                });
            }
            nodes => report
                .errors_with_multiple_nodes
                .push(DebugErrorWithMultipleNodes {
                    code: error.code(),
                    message: error.message.clone(),
                    nodes: nodes.iter().map(DebugNode::from).collect(),
                }),
        }
    }

    report
}

/// Text errors first, then single-node errors, then multi-node errors, under
/// a banner as wide as the longest line.
pub(crate) fn human(errors: &[CompilationError]) -> String {
    let mut blocks: Vec<String> = Vec::new();
    blocks.extend(
        errors
            .iter()
            .filter(|error| error.nodes.is_empty())
            .map(|error| error.message.clone()),
    );
    blocks.extend(
        errors
            .iter()
            .filter(|error| error.nodes.len() == 1)
            .map(single_node),
    );
    blocks.extend(
        errors
            .iter()
            .filter(|error| error.nodes.len() > 1)
            .map(multiple_nodes),
    );

    let longest = blocks
        .iter()
        .flat_map(|block| block.split('\n'))
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    let prefix = "/-".repeat(longest.saturating_sub(HEADER.len() + 2) / 4);
    blocks.insert(0, format!("\n{prefix} {HEADER} {prefix}\n"));

    blocks.join("\n")
}

fn involved_context(error: &CompilationError) -> String {
    match &error.related_context {
        Some(context) => format!("Involved context: ({context})\n"),
        None => String::new(),
    }
}

fn single_node(error: &CompilationError) -> String {
    let node = error
        .nodes
        .first()
        .map(ToString::to_string)
        .unwrap_or_default();
    format!(
        "{}\n{}At: ({node})\n",
        error.message,
        involved_context(error)
    )
}

fn multiple_nodes(error: &CompilationError) -> String {
    let nodes: Vec<String> = error.nodes.iter().map(|node| format!("({node})")).collect();
    format!(
        "{}\n{}{}\n",
        error.message,
        involved_context(error),
        nodes.join("\n")
    )
}
