use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use dicat_core::{Name, Range};
use serde::{Deserialize, Serialize};

use crate::TypeRef;

/// Already-parsed declarative annotation (`@Bean({ qualifier: "x" })`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: Name,
    #[serde(default)]
    pub args: Vec<AnnotationArg>,
    #[serde(default)]
    pub range: Range,
}

impl Annotation {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref();
        Self {
            name: Name::new(name.strip_prefix('@').unwrap_or(name)),
            args: Vec::new(),
            range: Range::default(),
        }
    }

    pub fn with_arg(mut self, arg: AnnotationArg) -> Self {
        self.args.push(arg);
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    /// Matches either the exact name or the simple name of a dotted path
    /// (`di.Bean` matches `Bean`).
    pub fn matches(&self, query: &str) -> bool {
        if self.name == query {
            return true;
        }
        let simple = self.name.rsplit('.').next().unwrap_or(&self.name);
        let query_simple = query.rsplit('.').next().unwrap_or(query);
        simple == query_simple
    }

    /// The first positional string argument, if any.
    pub fn string_arg(&self) -> Option<&str> {
        self.args.iter().find_map(|arg| match arg {
            AnnotationArg::String(value) => Some(value.as_str()),
            _ => None,
        })
    }

    /// Looks `key` up in the first object-literal argument.
    pub fn option(&self, key: &str) -> Option<&AnnotationArg> {
        self.args.iter().find_map(|arg| match arg {
            AnnotationArg::Object(entries) => entries.get(key),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationArg {
    String(String),
    Object(BTreeMap<Name, AnnotationArg>),
    Opaque(serde_json::Value),
}

pub fn find_annotation<'a>(annotations: &'a [Annotation], name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.matches(name))
}

pub fn has_annotation(annotations: &[Annotation], name: &str) -> bool {
    find_annotation(annotations, name).is_some()
}

/// Initializer expressions, reduced to what bean extraction needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Expr {
    Call {
        callee: Name,
        #[serde(default, rename = "typeArgs")]
        type_args: Vec<TypeRef>,
        #[serde(default)]
        args: Vec<Expr>,
        #[serde(default)]
        range: Range,
    },
    Identifier {
        name: Name,
        #[serde(default)]
        range: Range,
    },
    StringLiteral {
        value: String,
        #[serde(default)]
        range: Range,
    },
    Object {
        #[serde(default)]
        properties: BTreeMap<Name, Expr>,
        #[serde(default)]
        range: Range,
    },
    Other {
        #[serde(default)]
        range: Range,
    },
}

impl Expr {
    pub fn range(&self) -> Range {
        match self {
            Expr::Call { range, .. }
            | Expr::Identifier { range, .. }
            | Expr::StringLiteral { range, .. }
            | Expr::Object { range, .. }
            | Expr::Other { range } => *range,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParamDecl {
    pub name: Name,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodDecl {
    pub name: Name,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub return_type: Option<TypeRef>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDecl {
    pub name: Name,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub ty: Option<TypeRef>,
    #[serde(default)]
    pub initializer: Option<Expr>,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ClassMember {
    Method(MethodDecl),
    Field(FieldDecl),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstructorDecl {
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassDecl {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<Name>,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub members: Vec<ClassMember>,
    #[serde(default)]
    pub constructor: Option<ConstructorDecl>,
    #[serde(default)]
    pub range: Range,
}

impl ClassDecl {
    pub fn has_annotation(&self, name: &str) -> bool {
        has_annotation(&self.annotations, name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceDecl {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<Name>,
    #[serde(default)]
    pub extends: Vec<TypeRef>,
    #[serde(default)]
    pub members: Vec<crate::TypeMember>,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeAliasDecl {
    pub name: Name,
    #[serde(default)]
    pub type_params: Vec<Name>,
    pub target: TypeRef,
    #[serde(default)]
    pub range: Range,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Declaration {
    Class(ClassDecl),
    Interface(InterfaceDecl),
    TypeAlias(TypeAliasDecl),
}

impl Declaration {
    pub fn name(&self) -> &Name {
        match self {
            Declaration::Class(decl) => &decl.name,
            Declaration::Interface(decl) => &decl.name,
            Declaration::TypeAlias(decl) => &decl.name,
        }
    }

    pub fn range(&self) -> Range {
        match self {
            Declaration::Class(decl) => decl.range,
            Declaration::Interface(decl) => decl.range,
            Declaration::TypeAlias(decl) => decl.range,
        }
    }

    pub fn type_params(&self) -> &[Name] {
        match self {
            Declaration::Class(decl) => &decl.type_params,
            Declaration::Interface(decl) => &decl.type_params,
            Declaration::TypeAlias(decl) => &decl.type_params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Import {
    /// `import { imported as local } from "from"`
    Named {
        local: Name,
        imported: Name,
        from: PathBuf,
    },
    /// `import * as local from "from"`
    Namespace { local: Name, from: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Export {
    /// `export { local as exported }`, or `export { local as exported } from "from"`.
    Named {
        exported: Name,
        local: Name,
        #[serde(default)]
        from: Option<PathBuf>,
    },
    /// `export * from "from"`
    All { from: PathBuf },
}

/// A call on the runtime accessor facade (`container.get("Name")`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerCall {
    pub method: Name,
    /// The literal context name argument; `None` when it is not a literal.
    #[serde(default)]
    pub context: Option<Name>,
    #[serde(default)]
    pub range: Range,
}

/// One compilation unit of the source model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFile {
    pub path: PathBuf,
    /// File-scoped annotations (the global context marker lives here).
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub imports: Vec<Import>,
    #[serde(default)]
    pub exports: Vec<Export>,
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    #[serde(default)]
    pub container_calls: Vec<ContainerCall>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn has_annotation(&self, name: &str) -> bool {
        has_annotation(&self.annotations, name)
    }

    pub fn declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|decl| decl.name() == name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.declarations.iter().filter_map(|decl| match decl {
            Declaration::Class(class) => Some(class),
            _ => None,
        })
    }
}
