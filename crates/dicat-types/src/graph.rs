//! Expanded types as graphs, and their canonical encoding.
//!
//! A recursive reference is an edge back to the vertex of the enclosing
//! expansion. Before encoding, vertices with the same infinite unfolding are
//! merged, so a recursive type and any unrolling of it encode identically.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use dicat_core::Name;

pub(crate) type VertexId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) enum SetOp {
    Union,
    Intersection,
}

impl SetOp {
    fn separator(self) -> &'static str {
        match self {
            SetOp::Union => "|",
            SetOp::Intersection => "&",
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Member {
    Property { optional: bool, ty: VertexId },
    Method { params: Vec<VertexId>, ret: VertexId },
}

#[derive(Debug, Clone)]
pub(crate) enum Shape {
    Leaf(String),
    Array(VertexId),
    Tuple(Vec<VertexId>),
    Function {
        params: Vec<VertexId>,
        ret: VertexId,
    },
    /// Arms in no particular order, possibly repeated.
    Set(SetOp, Vec<VertexId>),
    /// Every variant of a member name (overloads) is kept.
    Object(BTreeMap<Name, Vec<Member>>),
}

impl Shape {
    fn edges_mut(&mut self) -> Vec<&mut VertexId> {
        match self {
            Shape::Leaf(_) => Vec::new(),
            Shape::Array(element) => vec![element],
            Shape::Tuple(vertices) | Shape::Set(_, vertices) => vertices.iter_mut().collect(),
            Shape::Function { params, ret } => {
                params.iter_mut().chain(std::iter::once(ret)).collect()
            }
            Shape::Object(members) => members
                .values_mut()
                .flatten()
                .flat_map(|member| match member {
                    Member::Property { ty, .. } => vec![ty],
                    Member::Method { params, ret } => {
                        params.iter_mut().chain(std::iter::once(ret)).collect()
                    }
                })
                .collect(),
        }
    }
}

#[derive(PartialEq, Eq, Hash, PartialOrd, Ord)]
enum MemberSignature {
    Property(bool, usize),
    Method(Vec<usize>, usize),
}

/// A vertex described through the classes of its successors.
#[derive(PartialEq, Eq, Hash)]
enum Signature {
    Vacant,
    Leaf(String),
    Array(usize),
    Tuple(Vec<usize>),
    Function(Vec<usize>, usize),
    Set(SetOp, BTreeSet<usize>),
    Object(Vec<(Name, BTreeSet<MemberSignature>)>),
}

/// Vertices are reserved when a node is entered and filled when it is left,
/// so a reference back into an unfinished node can already point at it.
#[derive(Debug, Default)]
pub(crate) struct TypeGraph {
    vertices: Vec<Option<Shape>>,
}

impl TypeGraph {
    pub(crate) fn reserve(&mut self) -> VertexId {
        self.vertices.push(None);
        self.vertices.len() - 1
    }

    pub(crate) fn fill(&mut self, vertex: VertexId, shape: Shape) {
        if let Some(slot) = self.vertices.get_mut(vertex) {
            *slot = Some(shape);
        }
    }

    pub(crate) fn leaf(&mut self, text: String) -> VertexId {
        self.vertices.push(Some(Shape::Leaf(text)));
        self.vertices.len() - 1
    }

    /// Structural key of a finished vertex, used to recognise a type argument
    /// that is written again. Unfinished vertices it reaches are `@id`.
    pub(crate) fn key(&self, vertex: VertexId) -> String {
        self.render(vertex, &|vertex| vertex, &mut Vec::new())
    }

    /// Canonical encoding of the type rooted at `root`.
    ///
    /// `None` when a set is made of nothing but references to itself.
    pub(crate) fn canonical(mut self, mut root: VertexId) -> Option<String> {
        loop {
            let classes = self.partition();
            let forward = self.collapsible_sets(&classes)?;
            if forward.is_empty() {
                return Some(self.render(root, &|vertex| classes[vertex], &mut Vec::new()));
            }

            root = follow(&forward, root)?;
            for vertex in forward.keys() {
                if let Some(slot) = self.vertices.get_mut(*vertex) {
                    *slot = None;
                }
            }
            for shape in self.vertices.iter_mut().flatten() {
                for edge in shape.edges_mut() {
                    *edge = follow(&forward, *edge)?;
                }
            }
        }
    }

    /// Coarsest partition in which every class agrees on its signature.
    fn partition(&self) -> Vec<usize> {
        let mut classes = vec![0; self.vertices.len()];
        let mut count = 1;
        loop {
            let mut ids: HashMap<(usize, Signature), usize> = HashMap::new();
            let next: Vec<usize> = (0..self.vertices.len())
                .map(|vertex| {
                    let key = (classes[vertex], self.signature(vertex, &classes));
                    let fresh = ids.len();
                    *ids.entry(key).or_insert(fresh)
                })
                .collect();
            // Each round refines the last one, so an unchanged count is a fixed point.
            if ids.len() == count {
                return next;
            }
            count = ids.len();
            classes = next;
        }
    }

    fn signature(&self, vertex: VertexId, classes: &[usize]) -> Signature {
        let class = |vertex: &VertexId| classes[*vertex];
        let Some(shape) = self.vertices.get(vertex).and_then(Option::as_ref) else {
            return Signature::Vacant;
        };
        match shape {
            Shape::Leaf(text) => Signature::Leaf(text.clone()),
            Shape::Array(element) => Signature::Array(class(element)),
            Shape::Tuple(elements) => Signature::Tuple(elements.iter().map(class).collect()),
            Shape::Function { params, ret } => {
                Signature::Function(params.iter().map(class).collect(), class(ret))
            }
            // `S = S | X` is `X`: arms re-entering the set itself are dropped.
            Shape::Set(op, arms) => Signature::Set(
                *op,
                arms.iter()
                    .map(class)
                    .filter(|arm| *arm != classes[vertex])
                    .collect(),
            ),
            Shape::Object(members) => Signature::Object(
                members
                    .iter()
                    .map(|(name, variants)| {
                        let variants = variants
                            .iter()
                            .map(|member| match member {
                                Member::Property { optional, ty } => {
                                    MemberSignature::Property(*optional, class(ty))
                                }
                                Member::Method { params, ret } => MemberSignature::Method(
                                    params.iter().map(class).collect(),
                                    class(ret),
                                ),
                            })
                            .collect();
                        (name.clone(), variants)
                    })
                    .collect(),
            ),
        }
    }

    /// Sets whose arms all fall into one class (besides the set itself),
    /// mapped to a vertex of that class.
    fn collapsible_sets(&self, classes: &[usize]) -> Option<BTreeMap<VertexId, VertexId>> {
        let mut forward = BTreeMap::new();
        for (vertex, shape) in self.vertices.iter().enumerate() {
            let Some(Shape::Set(_, arms)) = shape else {
                continue;
            };
            let own = classes[vertex];
            let mut others = arms.iter().filter(|arm| classes[**arm] != own);
            let first = *others.next()?;
            if others.all(|arm| classes[*arm] == classes[first]) {
                forward.insert(vertex, first);
            }
        }
        Some(forward)
    }

    fn render(
        &self,
        vertex: VertexId,
        class: &dyn Fn(VertexId) -> usize,
        path: &mut Vec<usize>,
    ) -> String {
        let Some(shape) = self.vertices.get(vertex).and_then(Option::as_ref) else {
            return format!("@{vertex}");
        };
        if let Shape::Leaf(text) = shape {
            return text.clone();
        }

        let own = class(vertex);
        if let Some(position) = path.iter().rposition(|entered| *entered == own) {
            return format!("^{}", path.len() - 1 - position);
        }
        path.push(own);
        let encoded = match shape {
            Shape::Leaf(text) => text.clone(),
            Shape::Array(element) => format!("{}[]", self.render(*element, class, path)),
            Shape::Tuple(elements) => {
                let elements = self.render_all(elements, class, path);
                format!("[{}]", elements.join(","))
            }
            Shape::Function { params, ret } => {
                let params = self.render_all(params, class, path);
                let ret = self.render(*ret, class, path);
                format!("(fn({})=>{ret})", params.join(","))
            }
            Shape::Set(op, arms) => {
                let mut seen = BTreeSet::new();
                let arms: BTreeSet<String> = arms
                    .iter()
                    .filter(|arm| {
                        let arm = class(**arm);
                        arm != own && seen.insert(arm)
                    })
                    .map(|arm| self.render(*arm, class, path))
                    .collect();
                let arms: Vec<String> = arms.into_iter().collect();
                format!("({})", arms.join(op.separator()))
            }
            Shape::Object(members) => {
                let mut parts = Vec::new();
                for (name, variants) in members {
                    let variants: BTreeSet<String> = variants
                        .iter()
                        .map(|member| self.render_member(name, member, class, path))
                        .collect();
                    parts.extend(variants);
                }
                format!("{{{}}}", parts.join(";"))
            }
        };
        path.pop();
        encoded
    }

    fn render_all(
        &self,
        vertices: &[VertexId],
        class: &dyn Fn(VertexId) -> usize,
        path: &mut Vec<usize>,
    ) -> Vec<String> {
        vertices
            .iter()
            .map(|vertex| self.render(*vertex, class, path))
            .collect()
    }

    fn render_member(
        &self,
        name: &Name,
        member: &Member,
        class: &dyn Fn(VertexId) -> usize,
        path: &mut Vec<usize>,
    ) -> String {
        match member {
            Member::Property { optional, ty } => {
                let mark = if *optional { "?" } else { "" };
                format!("{:?}{mark}:{}", name.as_str(), self.render(*ty, class, path))
            }
            Member::Method { params, ret } => {
                let params = self.render_all(params, class, path);
                let ret = self.render(*ret, class, path);
                format!("{:?}({}):{ret}", name.as_str(), params.join(","))
            }
        }
    }
}

fn follow(forward: &BTreeMap<VertexId, VertexId>, mut vertex: VertexId) -> Option<VertexId> {
    for _ in 0..=forward.len() {
        match forward.get(&vertex) {
            Some(next) => vertex = *next,
            None => return Some(vertex),
        }
    }
    None
}
