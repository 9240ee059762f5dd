use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use dicat_core::Name;
use dicat_model::{
    resolve_symbol, ClassDecl, ClassMember, Declaration, InterfaceDecl, PrimitiveType, SourceModel,
    Symbol, TypeMember, TypeRef,
};

use crate::graph::{Member, SetOp, Shape, TypeGraph, VertexId};
use crate::{QualifyError, TypeIdentity};

const MAX_EXPANSION_DEPTH: usize = 64;

/// Names that denote arrays even when the model has no declaration for them.
const BUILTIN_ARRAYS: &[&str] = &["Array", "ReadonlyArray"];

/// Qualifies type references against one immutable [`SourceModel`].
///
/// Results are memoized per `(file, type reference)`; create a new qualifier
/// for every compilation pass.
pub struct TypeQualifier<'m> {
    model: &'m dyn SourceModel,
    cache: HashMap<(PathBuf, TypeRef), Result<TypeIdentity, QualifyError>>,
}

impl<'m> TypeQualifier<'m> {
    pub fn new(model: &'m dyn SourceModel) -> Self {
        Self {
            model,
            cache: HashMap::new(),
        }
    }

    pub fn model(&self) -> &'m dyn SourceModel {
        self.model
    }

    /// Qualifies `ty` as written in `file`.
    ///
    /// `None` and `void` fail with [`QualifyError::HasNoType`]; types without
    /// any structural node (primitives, literals and unions of them) fail with
    /// [`QualifyError::TypeIsPrimitive`].
    pub fn qualify(
        &mut self,
        file: &Path,
        ty: Option<&TypeRef>,
    ) -> Result<TypeIdentity, QualifyError> {
        let Some(ty) = ty else {
            return Err(QualifyError::HasNoType);
        };

        let key = (file.to_path_buf(), ty.clone());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        let result = qualify_uncached(self.model, file, ty);
        match &result {
            Ok(identity) => tracing::trace!(
                target: "dicat.types",
                path = %file.display(),
                ty = %ty,
                %identity,
                "qualified type"
            ),
            Err(err) => tracing::debug!(
                target: "dicat.types",
                path = %file.display(),
                ty = %ty,
                error = %err,
                "type not qualified"
            ),
        }
        self.cache.insert(key, result.clone());
        result
    }

    /// Qualifies the type a declaration name (a constructor reference) defines.
    pub fn qualify_declaration(
        &mut self,
        file: &Path,
        name: &str,
    ) -> Result<TypeIdentity, QualifyError> {
        self.qualify(file, Some(&TypeRef::named(name)))
    }

    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

fn qualify_uncached(
    model: &dyn SourceModel,
    file: &Path,
    ty: &TypeRef,
) -> Result<TypeIdentity, QualifyError> {
    let mut encoder = Encoder::new(model);
    let root = encoder.encode(file, ty, &Bindings::new())?;
    let shapes = encoder.shapes;
    let Some(key) = encoder.graph.canonical(root) else {
        return Err(QualifyError::CircularType {
            name: ty.to_string().into(),
        });
    };
    if shapes == 0 {
        if key == PrimitiveType::Void.keyword() {
            return Err(QualifyError::HasNoType);
        }
        return Err(QualifyError::TypeIsPrimitive { ty: ty.to_string() });
    }
    Ok(TypeIdentity(key))
}

/// Type parameter name -> vertex of the type argument.
type Bindings = HashMap<Name, VertexId>;

#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameKey {
    path: PathBuf,
    name: Name,
    /// Structural keys of the type arguments.
    args: Vec<String>,
}

/// A declaration whose expansion is in progress.
#[derive(Debug)]
struct Frame {
    key: FrameKey,
    /// Position in the node stack of the node the declaration expands into.
    level: usize,
}

enum Target<'m> {
    /// Already expanded: a bound type parameter or a builtin array.
    Bound(VertexId),
    Decl {
        symbol: Symbol<'m>,
        key: FrameKey,
        bindings: Bindings,
    },
}

impl SetOp {
    fn matches(self, ty: &TypeRef) -> bool {
        matches!(
            (self, ty),
            (SetOp::Union, TypeRef::Union { .. })
                | (SetOp::Intersection, TypeRef::Intersection { .. })
        )
    }
}

/// Members of one object node, keyed by name so that declaration order is irrelevant.
#[derive(Default)]
struct Members(BTreeMap<Name, Vec<Member>>);

impl Members {
    fn insert(&mut self, name: Name, member: Member) {
        self.0.entry(name).or_default().push(member);
    }

    /// Members declared on the derived type replace inherited ones of the same name.
    fn merge(&mut self, own: Members) {
        for (name, members) in own.0 {
            self.0.insert(name, members);
        }
    }
}

struct Encoder<'m> {
    model: &'m dyn SourceModel,
    graph: TypeGraph,
    frames: Vec<Frame>,
    /// Vertices of the nodes enclosing the current position, outermost first.
    stack: Vec<VertexId>,
    /// Number of structural nodes (objects, arrays, tuples, functions) emitted.
    shapes: usize,
}

impl<'m> Encoder<'m> {
    fn new(model: &'m dyn SourceModel) -> Self {
        Self {
            model,
            graph: TypeGraph::default(),
            frames: Vec::new(),
            stack: Vec::new(),
            shapes: 0,
        }
    }

    fn encode(
        &mut self,
        file: &Path,
        ty: &TypeRef,
        env: &Bindings,
    ) -> Result<VertexId, QualifyError> {
        match ty {
            TypeRef::Named { name, args } => match self.lookup(file, name, args, env)? {
                Target::Bound(vertex) => Ok(vertex),
                Target::Decl {
                    symbol,
                    key,
                    bindings,
                } => self.expand_named(symbol, key, &bindings),
            },
            TypeRef::Primitive { name } => Ok(self.graph.leaf(name.keyword().to_string())),
            TypeRef::StringLiteral { value } => Ok(self.graph.leaf(format!("{value:?}"))),
            TypeRef::NumberLiteral { value } => Ok(self.graph.leaf(format!("#{value}"))),
            TypeRef::BooleanLiteral { value } => Ok(self.graph.leaf(value.to_string())),
            TypeRef::Object { members } => {
                self.object(|this, out| this.collect_members(file, members, env, out))
            }
            TypeRef::Array { element } => self.array(file, element, env),
            TypeRef::Tuple { elements } => {
                self.shape(|this| Ok(Shape::Tuple(this.encode_all(file, elements, env)?)))
            }
            TypeRef::Function { params, ret } => self.shape(|this| {
                let params = this.encode_all(file, params, env)?;
                let ret = this.encode(file, ret, env)?;
                Ok(Shape::Function { params, ret })
            }),
            TypeRef::Union { .. } => self.set(file, ty, env, SetOp::Union),
            TypeRef::Intersection { .. } => self.set(file, ty, env, SetOp::Intersection),
        }
    }

    fn encode_all(
        &mut self,
        file: &Path,
        types: &[TypeRef],
        env: &Bindings,
    ) -> Result<Vec<VertexId>, QualifyError> {
        types.iter().map(|ty| self.encode(file, ty, env)).collect()
    }

    fn node(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Shape, QualifyError>,
    ) -> Result<VertexId, QualifyError> {
        let vertex = self.graph.reserve();
        self.stack.push(vertex);
        let shape = f(self);
        self.stack.pop();
        self.graph.fill(vertex, shape?);
        Ok(vertex)
    }

    fn shape(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<Shape, QualifyError>,
    ) -> Result<VertexId, QualifyError> {
        self.shapes += 1;
        self.node(f)
    }

    fn object(
        &mut self,
        fill: impl FnOnce(&mut Self, &mut Members) -> Result<(), QualifyError>,
    ) -> Result<VertexId, QualifyError> {
        self.shape(|this| {
            let mut members = Members::default();
            fill(this, &mut members)?;
            Ok(Shape::Object(members.0))
        })
    }

    fn array(
        &mut self,
        file: &Path,
        element: &TypeRef,
        env: &Bindings,
    ) -> Result<VertexId, QualifyError> {
        self.shape(|this| Ok(Shape::Array(this.encode(file, element, env)?)))
    }

    fn set(
        &mut self,
        file: &Path,
        ty: &TypeRef,
        env: &Bindings,
        op: SetOp,
    ) -> Result<VertexId, QualifyError> {
        self.node(|this| {
            let mut arms = Vec::new();
            this.collect_arms(file, ty, env, op, &mut arms)?;
            Ok(Shape::Set(op, arms))
        })
    }

    /// Flattens nested sets of the same kind, including ones reached through aliases.
    fn collect_arms(
        &mut self,
        file: &Path,
        ty: &TypeRef,
        env: &Bindings,
        op: SetOp,
        arms: &mut Vec<VertexId>,
    ) -> Result<(), QualifyError> {
        match ty {
            TypeRef::Union { types } | TypeRef::Intersection { types } if op.matches(ty) => {
                for ty in types {
                    self.collect_arms(file, ty, env, op, arms)?;
                }
                Ok(())
            }
            TypeRef::Named { name, args } => {
                match self.lookup(file, name, args, env)? {
                    Target::Bound(vertex) => arms.push(vertex),
                    Target::Decl {
                        symbol,
                        key,
                        bindings,
                    } => match symbol.decl {
                        Declaration::TypeAlias(alias) if op.matches(&alias.target) => {
                            // The alias expands into the set node we are filling.
                            let level = self.stack.len().saturating_sub(1);
                            match self.enter(key, level)? {
                                Some(vertex) => arms.push(vertex),
                                None => {
                                    let result = self.collect_arms(
                                        symbol.path(),
                                        &alias.target,
                                        &bindings,
                                        op,
                                        arms,
                                    );
                                    self.frames.pop();
                                    result?;
                                }
                            }
                        }
                        _ => arms.push(self.expand_named(symbol, key, &bindings)?),
                    },
                }
                Ok(())
            }
            _ => {
                arms.push(self.encode(file, ty, env)?);
                Ok(())
            }
        }
    }

    fn lookup(
        &mut self,
        file: &Path,
        name: &Name,
        args: &[TypeRef],
        env: &Bindings,
    ) -> Result<Target<'m>, QualifyError> {
        if args.is_empty() {
            if let Some(bound) = env.get(name) {
                return Ok(Target::Bound(*bound));
            }
        }

        let Some(symbol) = resolve_symbol(self.model, file, name) else {
            if let [element] = args {
                if BUILTIN_ARRAYS.contains(&name.as_str()) {
                    return self.array(file, element, env).map(Target::Bound);
                }
            }
            return Err(QualifyError::UnresolvedType { name: name.clone() });
        };

        let params = symbol.decl.type_params();
        if params.len() != args.len() {
            return Err(QualifyError::TypeArgumentCount {
                name: name.clone(),
                expected: params.len(),
                found: args.len(),
            });
        }

        let args = self.encode_all(file, args, env)?;
        let bindings = params.iter().cloned().zip(args.iter().copied()).collect();
        let key = FrameKey {
            path: symbol.path().to_path_buf(),
            name: symbol.decl.name().clone(),
            args: args.iter().map(|arg| self.graph.key(*arg)).collect(),
        };
        Ok(Target::Decl {
            symbol,
            key,
            bindings,
        })
    }

    fn expand_named(
        &mut self,
        symbol: Symbol<'m>,
        key: FrameKey,
        env: &Bindings,
    ) -> Result<VertexId, QualifyError> {
        if let Some(vertex) = self.enter(key, self.stack.len())? {
            return Ok(vertex);
        }
        let path = symbol.path();
        let result = match symbol.decl {
            Declaration::TypeAlias(alias) => self.encode(path, &alias.target, env),
            Declaration::Interface(iface) => {
                self.object(|this, out| this.collect_interface(path, iface, env, out))
            }
            Declaration::Class(class) => self.object(|this, out| {
                this.collect_members(path, &instance_members(class), env, out)
            }),
        };
        self.frames.pop();
        result
    }

    /// Starts expanding `key` into the node at stack position `level`.
    ///
    /// Returns the vertex of that node instead when `key` is already being
    /// expanded; the frame is only pushed when `None` is returned.
    fn enter(&mut self, key: FrameKey, level: usize) -> Result<Option<VertexId>, QualifyError> {
        if let Some(active) = self.frames.iter().rev().find(|frame| frame.key == key) {
            // No node exists yet when the declaration re-enters itself directly.
            return match self.stack.get(active.level) {
                Some(vertex) => Ok(Some(*vertex)),
                None => Err(QualifyError::CircularType { name: key.name }),
            };
        }
        self.push(key, level)?;
        Ok(None)
    }

    fn push(&mut self, key: FrameKey, level: usize) -> Result<(), QualifyError> {
        if self.frames.len() >= MAX_EXPANSION_DEPTH {
            return Err(QualifyError::ExpansionTooDeep { name: key.name });
        }
        self.frames.push(Frame { key, level });
        Ok(())
    }

    fn collect_interface(
        &mut self,
        path: &Path,
        iface: &InterfaceDecl,
        env: &Bindings,
        out: &mut Members,
    ) -> Result<(), QualifyError> {
        for base in &iface.extends {
            self.collect_base(path, base, env, out)?;
        }
        let mut own = Members::default();
        self.collect_members(path, &iface.members, env, &mut own)?;
        out.merge(own);
        Ok(())
    }

    /// Copies the members of a heritage clause entry into the derived type's object node.
    fn collect_base(
        &mut self,
        file: &Path,
        base: &TypeRef,
        env: &Bindings,
        out: &mut Members,
    ) -> Result<(), QualifyError> {
        match base {
            TypeRef::Object { members } => self.collect_members(file, members, env, out),
            TypeRef::Intersection { types } => {
                for ty in types {
                    self.collect_base(file, ty, env, out)?;
                }
                Ok(())
            }
            TypeRef::Named { name, args } => {
                let Target::Decl {
                    symbol,
                    key,
                    bindings,
                } = self.lookup(file, name, args, env)?
                else {
                    return Err(QualifyError::InvalidBase {
                        ty: base.to_string(),
                    });
                };

                let level = self.stack.len().saturating_sub(1);
                if self
                    .frames
                    .iter()
                    .any(|frame| frame.key == key && frame.level == level)
                {
                    return Err(QualifyError::CircularType { name: name.clone() });
                }
                self.push(key, level)?;

                let path = symbol.path();
                let result = match symbol.decl {
                    Declaration::Interface(iface) => {
                        self.collect_interface(path, iface, &bindings, out)
                    }
                    Declaration::Class(class) => {
                        self.collect_members(path, &instance_members(class), &bindings, out)
                    }
                    Declaration::TypeAlias(alias) => {
                        self.collect_base(path, &alias.target, &bindings, out)
                    }
                };
                self.frames.pop();
                result
            }
            _ => Err(QualifyError::InvalidBase {
                ty: base.to_string(),
            }),
        }
    }

    fn collect_members(
        &mut self,
        file: &Path,
        members: &[TypeMember],
        env: &Bindings,
        out: &mut Members,
    ) -> Result<(), QualifyError> {
        for member in members {
            let encoded = match member {
                TypeMember::Property { optional, ty, .. } => Member::Property {
                    optional: *optional,
                    ty: self.encode(file, ty, env)?,
                },
                TypeMember::Method { params, ret, .. } => Member::Method {
                    params: self.encode_all(file, params, env)?,
                    ret: self.encode(file, ret, env)?,
                },
            };
            out.insert(member.name().clone(), encoded);
        }
        Ok(())
    }
}

/// The instance side of a class, as an object type. Untyped members are `any`.
fn instance_members(class: &ClassDecl) -> Vec<TypeMember> {
    let any = || TypeRef::primitive(PrimitiveType::Any);
    class
        .members
        .iter()
        .filter_map(|member| match member {
            ClassMember::Field(field) if !field.is_static => Some(TypeMember::Property {
                name: field.name.clone(),
                optional: false,
                ty: field.ty.clone().unwrap_or_else(any),
            }),
            ClassMember::Method(method) if !method.is_static => Some(TypeMember::Method {
                name: method.name.clone(),
                params: method
                    .params
                    .iter()
                    .map(|param| param.ty.clone().unwrap_or_else(any))
                    .collect(),
                ret: method.return_type.clone().unwrap_or_else(any),
            }),
            _ => None,
        })
        .collect()
}
