//! Shared types used across Nova crates.
//!
//! This crate carries the resolved, erased view of Java types that the flow
//! analyses consume: class hierarchy, sealed/enum metadata, and the checked
//! exception set algebra. Generic arguments are recorded but ignored by
//! subtyping.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

mod exceptions;

pub use crate::exceptions::{
    diff, excl, incl, intersect, intersects, is_checked, is_handled, is_unchecked, subset, union,
};

/// A byte-span into a source string.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({}..{})", self.start, self.end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, span: Option<Span>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

// === Types ===

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(u32);

impl ClassId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn to_raw(self) -> u32 {
        self.0
    }

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeVarId(u32);

impl TypeVarId {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for TypeVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeVarId({})", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ClassType {
    pub def: ClassId,
    pub args: Vec<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Primitive(PrimitiveType),
    Class(ClassType),
    Array(Box<Type>),
    TypeVar(TypeVarId),
    Intersection(Vec<Type>),
    /// The type of the `null` literal.
    Null,
    /// A reference that attribution could not resolve.
    Named(String),
    /// Not attributed (e.g. a statement-level node).
    Unknown,
    /// An erroneous type. Analyses skip subtrees carrying it.
    Error,
}

impl Type {
    pub fn class(def: ClassId, args: Vec<Type>) -> Self {
        Type::Class(ClassType { def, args })
    }

    pub fn boolean() -> Self {
        Type::Primitive(PrimitiveType::Boolean)
    }

    pub fn int() -> Self {
        Type::Primitive(PrimitiveType::Int)
    }

    pub fn is_erroneous(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Type::Primitive(PrimitiveType::Boolean))
    }

    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Class(_) | Type::Array(_) | Type::TypeVar(_) | Type::Intersection(_) | Type::Null
        )
    }

    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Type::Class(ClassType { def, .. }) => Some(*def),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Class,
    Interface,
    Enum,
    Record,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodDef {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
    pub thrown: Vec<Type>,
    pub is_static: bool,
    pub is_abstract: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub kind: ClassKind,
    pub type_params: Vec<TypeVarId>,
    pub super_class: Option<Type>,
    pub interfaces: Vec<Type>,
    pub is_abstract: bool,
    pub is_sealed: bool,
    pub permitted_subclasses: Vec<ClassId>,
    /// Declared constants, in declaration order (enums only).
    pub enum_constants: Vec<String>,
    pub methods: Vec<MethodDef>,
}

impl ClassDef {
    /// A plain, non-generic class with the given superclass.
    pub fn class(name: impl Into<String>, super_class: Option<Type>) -> Self {
        Self {
            name: name.into(),
            kind: ClassKind::Class,
            type_params: Vec::new(),
            super_class,
            interfaces: Vec::new(),
            is_abstract: false,
            is_sealed: false,
            permitted_subclasses: Vec::new(),
            enum_constants: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeParamDef {
    pub name: String,
    pub upper_bounds: Vec<Type>,
    pub lower_bound: Option<Type>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub object: ClassId,
    pub string: ClassId,
    pub cloneable: ClassId,
    pub serializable: ClassId,
    pub throwable: ClassId,
    pub exception: ClassId,
    pub runtime_exception: ClassId,
    pub error: ClassId,
    pub auto_closeable: ClassId,
}

/// Read-only view of the resolved class universe.
pub trait TypeEnv {
    fn class(&self, id: ClassId) -> Option<&ClassDef>;
    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef>;
    fn lookup_class(&self, name: &str) -> Option<ClassId>;
    fn well_known(&self) -> &WellKnownTypes;
}

#[derive(Clone, Debug)]
pub struct TypeStore {
    classes: Vec<ClassDef>,
    by_name: HashMap<String, ClassId>,
    type_params: Vec<TypeParamDef>,
    well_known: WellKnownTypes,
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::with_minimal_jdk()
    }
}

impl TypeStore {
    /// A store seeded with the handful of `java.lang`/`java.io` classes the
    /// flow analyses reason about.
    pub fn with_minimal_jdk() -> Self {
        let placeholder = ClassId::from_raw(0);
        let mut store = TypeStore {
            classes: Vec::new(),
            by_name: HashMap::new(),
            type_params: Vec::new(),
            well_known: WellKnownTypes {
                object: placeholder,
                string: placeholder,
                cloneable: placeholder,
                serializable: placeholder,
                throwable: placeholder,
                exception: placeholder,
                runtime_exception: placeholder,
                error: placeholder,
                auto_closeable: placeholder,
            },
        };

        let object = store.add_class(ClassDef::class("java.lang.Object", None));
        let object_ty = Type::class(object, vec![]);
        let interface = |name: &str| {
            let mut def = ClassDef::class(name, None);
            def.kind = ClassKind::Interface;
            def.is_abstract = true;
            def
        };

        let cloneable = store.add_class(interface("java.lang.Cloneable"));
        let serializable = store.add_class(interface("java.io.Serializable"));
        let string = store.add_class(ClassDef {
            interfaces: vec![Type::class(serializable, vec![])],
            ..ClassDef::class("java.lang.String", Some(object_ty.clone()))
        });
        store.add_class(ClassDef::class("java.lang.Integer", Some(object_ty.clone())));
        store.add_class(ClassDef {
            methods: vec![MethodDef {
                name: "run".to_string(),
                params: vec![],
                return_type: Type::Void,
                thrown: vec![],
                is_static: false,
                is_abstract: true,
            }],
            ..interface("java.lang.Runnable")
        });

        let throwable = store.add_class(ClassDef {
            interfaces: vec![Type::class(serializable, vec![])],
            ..ClassDef::class("java.lang.Throwable", Some(object_ty.clone()))
        });
        let exception = store.add_exception("java.lang.Exception", throwable);
        let runtime_exception = store.add_exception("java.lang.RuntimeException", exception);
        let error = store.add_exception("java.lang.Error", throwable);
        store.add_exception("java.lang.IllegalStateException", runtime_exception);
        store.add_exception("java.lang.IllegalArgumentException", runtime_exception);
        store.add_exception("java.lang.NullPointerException", runtime_exception);
        store.add_exception("java.lang.InterruptedException", exception);
        store.add_exception("java.lang.CloneNotSupportedException", exception);
        store.add_exception("java.lang.AssertionError", error);
        let io_exception = store.add_exception("java.io.IOException", exception);
        store.add_exception("java.io.FileNotFoundException", io_exception);

        let exception_ty = Type::class(exception, vec![]);
        let io_exception_ty = Type::class(io_exception, vec![]);
        let close = |thrown: Type| MethodDef {
            name: "close".to_string(),
            params: vec![],
            return_type: Type::Void,
            thrown: vec![thrown],
            is_static: false,
            is_abstract: true,
        };
        let auto_closeable = store.add_class(ClassDef {
            methods: vec![close(exception_ty)],
            ..interface("java.lang.AutoCloseable")
        });
        store.add_class(ClassDef {
            interfaces: vec![Type::class(auto_closeable, vec![])],
            methods: vec![close(io_exception_ty)],
            ..interface("java.io.Closeable")
        });

        store.well_known = WellKnownTypes {
            object,
            string,
            cloneable,
            serializable,
            throwable,
            exception,
            runtime_exception,
            error,
            auto_closeable,
        };
        store
    }

    fn add_exception(&mut self, name: &str, super_class: ClassId) -> ClassId {
        self.add_class(ClassDef::class(
            name,
            Some(Type::class(super_class, vec![])),
        ))
    }

    /// Returns the id for `name`, creating an empty placeholder definition if
    /// the class is not known yet.
    pub fn intern_class_id(&mut self, name: &str) -> ClassId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = ClassId::from_raw(self.classes.len() as u32);
        let super_class =
            (!self.classes.is_empty()).then(|| Type::class(self.well_known.object, vec![]));
        self.classes.push(ClassDef::class(name, super_class));
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn define_class(&mut self, id: ClassId, def: ClassDef) {
        self.by_name.insert(def.name.clone(), id);
        self.classes[id.idx()] = def;
    }

    pub fn add_class(&mut self, def: ClassDef) -> ClassId {
        let id = self.intern_class_id(&def.name);
        self.define_class(id, def);
        id
    }

    pub fn add_type_param(
        &mut self,
        name: impl Into<String>,
        upper_bounds: Vec<Type>,
    ) -> TypeVarId {
        let id = TypeVarId::from_raw(self.type_params.len() as u32);
        self.type_params.push(TypeParamDef {
            name: name.into(),
            upper_bounds,
            lower_bound: None,
        });
        id
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    /// Class type for a well-known or registered binary name.
    pub fn class_type(&self, name: &str) -> Option<Type> {
        self.lookup_class(name).map(|id| Type::class(id, vec![]))
    }
}

impl TypeEnv for TypeStore {
    fn class(&self, id: ClassId) -> Option<&ClassDef> {
        self.classes.get(id.idx())
    }

    fn type_param(&self, id: TypeVarId) -> Option<&TypeParamDef> {
        self.type_params.get(id.idx())
    }

    fn lookup_class(&self, name: &str) -> Option<ClassId> {
        self.class_id(name)
            .or_else(|| self.class_id(&format!("java.lang.{name}")))
            .or_else(|| self.class_id(&format!("java.io.{name}")))
    }

    fn well_known(&self) -> &WellKnownTypes {
        &self.well_known
    }
}

// === Subtyping ===

/// Direct supertypes of a class: its superclass (or `Object`) and interfaces.
pub fn direct_supertypes(env: &dyn TypeEnv, id: ClassId) -> Vec<ClassId> {
    let Some(def) = env.class(id) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    match &def.super_class {
        Some(sup) => out.extend(sup.class_id()),
        None if id != env.well_known().object => out.push(env.well_known().object),
        None => {}
    }
    out.extend(def.interfaces.iter().filter_map(Type::class_id));
    out
}

/// Reflexive, transitive subclass check over erased class ids.
pub fn is_subclass(env: &dyn TypeEnv, sub: ClassId, sup: ClassId) -> bool {
    if sub == sup || sup == env.well_known().object {
        return true;
    }
    let mut seen = vec![sub];
    let mut stack = vec![sub];
    while let Some(id) = stack.pop() {
        for next in direct_supertypes(env, id) {
            if next == sup {
                return true;
            }
            if !seen.contains(&next) {
                seen.push(next);
                stack.push(next);
            }
        }
    }
    false
}

/// Upper bounds of a type variable, defaulting to `Object`.
pub fn upper_bounds(env: &dyn TypeEnv, id: TypeVarId) -> Vec<Type> {
    match env.type_param(id) {
        Some(param) if !param.upper_bounds.is_empty() => param.upper_bounds.clone(),
        _ => vec![Type::class(env.well_known().object, vec![])],
    }
}

/// Finds the most specific declaration of `name/arity` in `id` or its
/// supertypes, searching breadth-first.
pub fn lookup_method<'a>(
    env: &'a dyn TypeEnv,
    id: ClassId,
    name: &str,
    arity: usize,
) -> Option<&'a MethodDef> {
    let mut queue = std::collections::VecDeque::from([id]);
    let mut seen = Vec::new();
    while let Some(next) = queue.pop_front() {
        if seen.contains(&next) {
            continue;
        }
        seen.push(next);
        let Some(def) = env.class(next) else {
            continue;
        };
        if let Some(method) = def
            .methods
            .iter()
            .find(|m| m.name == name && m.params.len() == arity)
        {
            return Some(method);
        }
        queue.extend(direct_supertypes(env, next));
    }
    None
}

pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    if sub == sup {
        return true;
    }
    match (sub, sup) {
        (Type::Error | Type::Unknown, _) | (_, Type::Error | Type::Unknown) => true,
        (_, Type::Intersection(parts)) => parts.iter().all(|p| is_subtype(env, sub, p)),
        (Type::Intersection(parts), _) => parts.iter().any(|p| is_subtype(env, p, sup)),
        (Type::Null, _) => sup.is_reference(),
        (Type::TypeVar(id), _) => upper_bounds(env, *id)
            .iter()
            .any(|bound| is_subtype(env, bound, sup)),
        (Type::Class(a), Type::Class(b)) => is_subclass(env, a.def, b.def),
        (Type::Array(_), Type::Class(b)) => {
            let wk = env.well_known();
            b.def == wk.object || b.def == wk.cloneable || b.def == wk.serializable
        }
        (Type::Array(a), Type::Array(b)) => match (a.as_ref(), b.as_ref()) {
            (Type::Primitive(x), Type::Primitive(y)) => x == y,
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
            (a, b) => is_subtype(env, a, b),
        },
        _ => false,
    }
}
