use std::collections::BTreeSet;

use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use serde::Serialize;

use crate::{BeanId, BeanRegistry, Context, ContextId, DependencyGraph};

/// One closed path of a dependency graph; the first bean is not repeated at
/// the end.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CycleReport {
    pub context: ContextId,
    pub beans: Vec<BeanId>,
}

impl CycleReport {
    /// `a -> b -> a`, using member names.
    pub fn describe(&self, beans: &BeanRegistry) -> String {
        let mut names: Vec<String> = self
            .beans
            .iter()
            .map(|id| match beans.get(*id) {
                Some(bean) => bean.member_name.to_string(),
                None => format!("#{}", id.index),
            })
            .collect();
        if let Some(first) = names.first().cloned() {
            names.push(first);
        }
        names.join(" -> ")
    }
}

/// Finds every distinct cycle among the beans of the graph's own context.
///
/// Edges into other contexts are ignored: the global context can never reach
/// back into a local one, so its cycles are found when its own graph is walked.
/// A cycle is reported once no matter which bean the walk enters it from.
pub fn detect_cycles(graph: &DependencyGraph) -> Vec<CycleReport> {
    let edges: Vec<Vec<usize>> = graph
        .iter()
        .map(|(_, edges)| {
            edges
                .iter()
                .filter(|edge| edge.target.context == graph.context)
                .map(|edge| edge.target.index as usize)
                .filter(|&target| target < graph.node_count())
                .collect()
        })
        .collect();

    find_cycles(&edges)
        .into_iter()
        .map(|cycle| CycleReport {
            context: graph.context,
            beans: cycle
                .into_iter()
                .map(|index| BeanId {
                    context: graph.context,
                    index: index as u32,
                })
                .collect(),
        })
        .collect()
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnPath,
    Done,
}

/// Depth-first walk over bean indices; every bean is entered once overall.
struct CycleWalk<'e> {
    edges: &'e [Vec<usize>],
    marks: Vec<Mark>,
    path: Vec<usize>,
    found: BTreeSet<Vec<usize>>,
}

impl CycleWalk<'_> {
    fn visit(&mut self, bean: usize) {
        self.marks[bean] = Mark::OnPath;
        self.path.push(bean);

        let edges = self.edges;
        for &provider in &edges[bean] {
            match self.marks[provider] {
                Mark::Unseen => self.visit(provider),
                Mark::OnPath => {
                    if let Some(start) = self.path.iter().position(|&b| b == provider) {
                        let cycle = self.path[start..].to_vec();
                        self.record(cycle);
                    }
                }
                Mark::Done => {}
            }
        }

        self.path.pop();
        self.marks[bean] = Mark::Done;
    }

    /// Stores `cycle` starting from its smallest bean, so entering the same
    /// cycle from another bean yields an equal key.
    fn record(&mut self, mut cycle: Vec<usize>) {
        let Some(start) = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, bean)| **bean)
            .map(|(pos, _)| pos)
        else {
            return;
        };
        cycle.rotate_left(start);
        self.found.insert(cycle);
    }
}

fn find_cycles(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let mut walk = CycleWalk {
        edges,
        marks: vec![Mark::Unseen; edges.len()],
        path: Vec::new(),
        found: BTreeSet::new(),
    };
    for bean in 0..edges.len() {
        if walk.marks[bean] == Mark::Unseen {
            walk.visit(bean);
        }
    }
    walk.found.into_iter().collect()
}

/// Reports every cycle as one multi-location diagnostic.
pub(crate) fn report_cycles(
    context: &Context,
    cycles: &[CycleReport],
    beans: &BeanRegistry,
    diagnostics: &mut CompilationDiagnostics,
) {
    for cycle in cycles {
        let path = cycle.describe(beans);
        tracing::debug!(
            target: "dicat.resolve",
            context = %context.name,
            cycle = %path,
            "cyclic dependency"
        );
        diagnostics.report(
            CompilationError::new(
                ErrorKind::CyclicDependency,
                Phase::Resolution,
                &context.source_path,
                format!("Cyclic dependency detected: {path}"),
            )
            .with_nodes(
                cycle
                    .beans
                    .iter()
                    .filter_map(|id| beans.get(*id))
                    .map(|bean| bean.location.clone()),
            ),
        );
    }
}
