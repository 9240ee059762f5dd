//! Provider extraction from configuration classes.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use dicat_core::{Location, Name, Range};
use dicat_diagnostics::{CompilationDiagnostics, CompilationError, ErrorKind, Phase};
use dicat_model::{
    find_annotation, has_annotation, AnnotationArg, ClassDecl, ClassMember, Expr, FieldDecl,
    MethodDecl, ParamDecl, TypeRef,
};
use dicat_types::{QualifyError, TypeIdentity, TypeQualifier};
use indexmap::IndexMap;
use serde::Serialize;

use crate::{Context, ContextId};

pub const BEAN_ANNOTATION: &str = "Bean";
pub const SINGLETON_ANNOTATION: &str = "Singleton";
pub const PROTOTYPE_ANNOTATION: &str = "Prototype";
/// Callee of a field bean initializer: `Bean<T>(Ctor, { ... })`.
pub const BEAN_FACTORY: &str = "Bean";

const QUALIFIER_OPTION: &str = "qualifier";
const SCOPE_OPTION: &str = "scope";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct BeanId {
    pub context: ContextId,
    pub index: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    #[default]
    Singleton,
    Prototype,
}

impl Scope {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "singleton" => Some(Scope::Singleton),
            "prototype" => Some(Scope::Prototype),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "String")]
pub enum Qualifier {
    #[default]
    Default,
    Named(Name),
}

impl Qualifier {
    pub const DEFAULT: &'static str = "default";

    /// `"default"` written out explicitly is the default qualifier.
    pub fn from_literal(value: &str) -> Self {
        if value == Self::DEFAULT {
            Qualifier::Default
        } else {
            Qualifier::Named(Name::new(value))
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Qualifier::Default)
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Qualifier::Default => f.write_str(Self::DEFAULT),
            Qualifier::Named(name) => f.write_str(name),
        }
    }
}

impl From<Qualifier> for String {
    fn from(qualifier: Qualifier) -> Self {
        qualifier.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum BeanKind {
    /// `@Bean` method; its parameters are the dependencies.
    Method { params: Vec<ParamDecl> },
    /// `Bean(Ctor)` field; dependencies come from the constructor of `Ctor`.
    Field {
        constructor: Option<Name>,
        constructor_range: Range,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bean {
    pub id: BeanId,
    pub member_name: Name,
    pub identity: TypeIdentity,
    /// The type as written, for messages.
    pub type_name: String,
    pub qualifier: Qualifier,
    pub scope: Scope,
    pub kind: BeanKind,
    pub location: Location,
}

impl Bean {
    pub fn matches(&self, identity: &TypeIdentity, qualifier: &Qualifier) -> bool {
        &self.identity == identity && &self.qualifier == qualifier
    }
}

/// Beans per context, in member declaration order.
#[derive(Debug, Default)]
pub struct BeanRegistry {
    by_context: HashMap<ContextId, Vec<Bean>>,
}

impl BeanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extracts the beans declared by `class`, replacing any previous beans of
    /// the context.
    ///
    /// Members that cannot be registered are reported and skipped. Duplicate
    /// `(identity, qualifier)` pairs are reported once per group.
    pub fn register_beans(
        &mut self,
        context: &Context,
        class: &ClassDecl,
        qualifier: &mut TypeQualifier<'_>,
        diagnostics: &mut CompilationDiagnostics,
    ) -> &[Bean] {
        let mut extractor = Extractor {
            path: &context.source_path,
            qualifier,
            diagnostics: &mut *diagnostics,
        };

        let mut beans = Vec::new();
        for member in &class.members {
            let id = BeanId {
                context: context.id,
                index: beans.len() as u32,
            };
            let registered = match member {
                ClassMember::Method(method) if !method.is_static => {
                    extractor.method_bean(id, method)
                }
                ClassMember::Field(field) if !field.is_static => extractor.field_bean(id, field),
                ClassMember::Method(_) | ClassMember::Field(_) => None,
            };
            beans.extend(registered);
        }

        report_ambiguous_beans(&beans, &context.source_path, diagnostics);

        tracing::debug!(
            target: "dicat.resolve",
            context = %context.name,
            beans = beans.len(),
            "registered beans"
        );
        self.by_context.insert(context.id, beans);
        self.beans(context.id)
    }

    pub fn beans(&self, context: ContextId) -> &[Bean] {
        self.by_context
            .get(&context)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn get(&self, id: BeanId) -> Option<&Bean> {
        self.by_context.get(&id.context)?.get(id.index as usize)
    }

    /// Beans of `context` providing `(identity, qualifier)`.
    pub fn find<'a>(
        &'a self,
        context: ContextId,
        identity: &'a TypeIdentity,
        qualifier: &'a Qualifier,
    ) -> impl Iterator<Item = &'a Bean> + 'a {
        self.beans(context)
            .iter()
            .filter(move |bean| bean.matches(identity, qualifier))
    }

    pub fn clear_context(&mut self, context: ContextId) -> Vec<Bean> {
        self.by_context.remove(&context).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_context.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_context.clear();
    }
}

fn report_ambiguous_beans(beans: &[Bean], path: &Path, diagnostics: &mut CompilationDiagnostics) {
    let mut groups: IndexMap<(&TypeIdentity, &Qualifier), Vec<&Bean>> = IndexMap::new();
    for bean in beans {
        groups
            .entry((&bean.identity, &bean.qualifier))
            .or_default()
            .push(bean);
    }

    for ((_, qualifier), group) in groups {
        let [first, _, ..] = group.as_slice() else {
            continue;
        };
        diagnostics.report(
            CompilationError::new(
                ErrorKind::AmbiguousBean,
                Phase::Registration,
                path,
                format!(
                    "Bean of type {} with qualifier \"{qualifier}\" is declared more than once",
                    first.type_name
                ),
            )
            .with_nodes(group.iter().map(|bean| bean.location.clone())),
        );
    }
}

struct Extractor<'a, 'm> {
    path: &'a Path,
    qualifier: &'a mut TypeQualifier<'m>,
    diagnostics: &'a mut CompilationDiagnostics,
}

impl Extractor<'_, '_> {
    fn method_bean(&mut self, id: BeanId, method: &MethodDecl) -> Option<Bean> {
        let annotation = find_annotation(&method.annotations, BEAN_ANNOTATION)?;
        let location = Location::new(self.path, method.range);

        let options = annotation.args.iter().find_map(|arg| match arg {
            AnnotationArg::Object(entries) => Some(entries),
            _ => None,
        });
        let entries: Vec<(Name, Option<&str>)> = match options {
            Some(entries) => entries
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        AnnotationArg::String(value) => Some(value.as_str()),
                        _ => None,
                    };
                    (key.clone(), value)
                })
                .collect(),
            None => Vec::new(),
        };
        let marker = self.scope_marker(method, &location);
        let (qualifier, scope) = self.bean_options(&entries, marker, &location);

        let identity = match self.qualifier.qualify(self.path, method.return_type.as_ref()) {
            Ok(identity) => identity,
            Err(err) => {
                self.report_bean_type(err, &location);
                return None;
            }
        };
        let type_name = method
            .return_type
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        Some(Bean {
            id,
            member_name: method.name.clone(),
            identity,
            type_name,
            qualifier,
            scope,
            kind: BeanKind::Method {
                params: method.params.clone(),
            },
            location,
        })
    }

    fn field_bean(&mut self, id: BeanId, field: &FieldDecl) -> Option<Bean> {
        let Some(Expr::Call {
            callee,
            type_args,
            args,
            ..
        }) = &field.initializer
        else {
            return None;
        };
        if callee != BEAN_FACTORY {
            return None;
        }
        let location = Location::new(self.path, field.range);

        let (constructor, constructor_range) = match args.first() {
            Some(Expr::Identifier { name, range }) => (Some(name.clone()), *range),
            Some(other) => (None, other.range()),
            None => (None, field.range),
        };

        let entries: Vec<(Name, Option<&str>)> = match args.get(1) {
            Some(Expr::Object { properties, .. }) => properties
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Expr::StringLiteral { value, .. } => Some(value.as_str()),
                        _ => None,
                    };
                    (key.clone(), value)
                })
                .collect(),
            Some(other) => {
                self.report(
                    ErrorKind::InvalidBeanOptions,
                    "Bean options should be an object literal",
                    Location::new(self.path, other.range()),
                );
                Vec::new()
            }
            None => Vec::new(),
        };
        let (qualifier, scope) = self.bean_options(&entries, None, &location);

        let (identity, type_name) = self.field_identity(
            field,
            type_args.first(),
            constructor.as_ref(),
            constructor_range,
            &location,
        )?;

        Some(Bean {
            id,
            member_name: field.name.clone(),
            identity,
            type_name,
            qualifier,
            scope,
            kind: BeanKind::Field {
                constructor,
                constructor_range,
            },
            location,
        })
    }

    fn field_identity(
        &mut self,
        field: &FieldDecl,
        type_arg: Option<&TypeRef>,
        constructor: Option<&Name>,
        constructor_range: Range,
        location: &Location,
    ) -> Option<(TypeIdentity, String)> {
        match (field.ty.as_ref(), type_arg) {
            (Some(field_ty), Some(type_arg)) => {
                let declared = self.qualify_explicit(field_ty, location)?;
                let argument = self.qualify_explicit(type_arg, location)?;
                if declared != argument {
                    self.report(
                        ErrorKind::ExplicitTypeMismatch,
                        format!(
                            "Field type {field_ty} and type argument {type_arg} \
                             of Bean should be the same type"
                        ),
                        location.clone(),
                    );
                    return None;
                }
                Some((declared, field_ty.to_string()))
            }
            (Some(ty), None) | (None, Some(ty)) => {
                let identity = self.qualify_explicit(ty, location)?;
                Some((identity, ty.to_string()))
            }
            (None, None) => {
                let Some(constructor) = constructor else {
                    self.report(
                        ErrorKind::CannotQualifyBean,
                        "First argument in Property-Bean should be a reference",
                        Location::new(self.path, constructor_range),
                    );
                    return None;
                };
                match self.qualifier.qualify_declaration(self.path, constructor) {
                    Ok(identity) => Some((identity, constructor.to_string())),
                    Err(err) => {
                        tracing::debug!(
                            target: "dicat.resolve",
                            constructor = %constructor,
                            error = %err,
                            "constructor type not qualified"
                        );
                        self.report(
                            ErrorKind::CannotQualifyBean,
                            "Can't qualify type of Bean, please specify type explicitly",
                            location.clone(),
                        );
                        None
                    }
                }
            }
        }
    }

    fn qualify_explicit(&mut self, ty: &TypeRef, location: &Location) -> Option<TypeIdentity> {
        match self.qualifier.qualify(self.path, Some(ty)) {
            Ok(identity) => Some(identity),
            Err(err) => {
                self.report_bean_type(err, location);
                None
            }
        }
    }

    fn report_bean_type(&mut self, err: QualifyError, location: &Location) {
        let (kind, message) = match err {
            QualifyError::HasNoType => (
                ErrorKind::HasNoType,
                "Bean should have return type".to_string(),
            ),
            QualifyError::TypeIsPrimitive { .. } => (
                ErrorKind::TypeIsPrimitive,
                "Bean should have complex return type (interfaces, ...etc)".to_string(),
            ),
            other => (
                ErrorKind::CannotQualifyBean,
                format!("Can't qualify type of Bean: {other}"),
            ),
        };
        self.report(kind, message, location.clone());
    }

    /// Scope given by `@Singleton` / `@Prototype` on a method.
    fn scope_marker(&mut self, method: &MethodDecl, location: &Location) -> Option<Scope> {
        let singleton = has_annotation(&method.annotations, SINGLETON_ANNOTATION);
        let prototype = has_annotation(&method.annotations, PROTOTYPE_ANNOTATION);
        match (singleton, prototype) {
            (true, true) => {
                self.report(
                    ErrorKind::InvalidBeanOptions,
                    "Bean can't be both Singleton and Prototype",
                    location.clone(),
                );
                None
            }
            (true, false) => Some(Scope::Singleton),
            (false, true) => Some(Scope::Prototype),
            (false, false) => None,
        }
    }

    /// Reads `{ qualifier, scope }`; `None` values are non-string literals.
    fn bean_options(
        &mut self,
        entries: &[(Name, Option<&str>)],
        marker: Option<Scope>,
        location: &Location,
    ) -> (Qualifier, Scope) {
        let mut qualifier = Qualifier::Default;
        let mut scope = None;

        for (key, value) in entries {
            match (key.as_str(), value) {
                (QUALIFIER_OPTION, Some(value)) => qualifier = Qualifier::from_literal(value),
                (QUALIFIER_OPTION, None) => self.report(
                    ErrorKind::InvalidBeanOptions,
                    "Qualifier should be a string literal",
                    location.clone(),
                ),
                (SCOPE_OPTION, Some(value)) => match Scope::parse(value) {
                    Some(parsed) => scope = Some(parsed),
                    None => self.report(
                        ErrorKind::InvalidBeanOptions,
                        format!(
                            "Unknown Bean scope \"{value}\", \
                             expected \"singleton\" or \"prototype\""
                        ),
                        location.clone(),
                    ),
                },
                (SCOPE_OPTION, None) => self.report(
                    ErrorKind::InvalidBeanOptions,
                    "Scope should be a string literal",
                    location.clone(),
                ),
                (other, _) => self.report(
                    ErrorKind::InvalidBeanOptions,
                    format!("Unknown Bean option \"{other}\""),
                    location.clone(),
                ),
            }
        }

        let scope = match (scope, marker) {
            (Some(option), Some(marker)) if option != marker => {
                self.report(
                    ErrorKind::InvalidBeanOptions,
                    "Bean scope option conflicts with its scope annotation",
                    location.clone(),
                );
                Scope::default()
            }
            (Some(scope), _) | (None, Some(scope)) => scope,
            (None, None) => Scope::default(),
        };
        (qualifier, scope)
    }

    fn report(&mut self, kind: ErrorKind, message: impl Into<String>, location: Location) {
        self.diagnostics.report(
            CompilationError::new(kind, Phase::Registration, self.path, message).at(location),
        );
    }
}
