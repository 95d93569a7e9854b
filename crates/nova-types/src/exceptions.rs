//! Checked-exception set algebra.
//!
//! Exception sets are small, duplicate-free lists kept in insertion order. A
//! set never holds two types where one is a subtype of the other: adding a
//! supertype evicts its subtypes, adding a subtype of a member is a no-op.

use crate::{is_subclass, is_subtype, upper_bounds, Type, TypeEnv};

/// `true` for types a method need not declare: subtypes of `RuntimeException`
/// or `Error`, the null type, and erroneous types.
pub fn is_unchecked(env: &dyn TypeEnv, exc: &Type) -> bool {
    let wk = env.well_known();
    match exc {
        Type::Class(class) => {
            is_subclass(env, class.def, wk.runtime_exception)
                || is_subclass(env, class.def, wk.error)
        }
        Type::TypeVar(id) => upper_bounds(env, *id)
            .first()
            .map_or(false, |bound| is_unchecked(env, bound)),
        Type::Intersection(parts) => parts.iter().any(|p| is_unchecked(env, p)),
        Type::Null | Type::Error | Type::Unknown | Type::Named(_) => true,
        Type::Void | Type::Primitive(_) | Type::Array(_) => false,
    }
}

pub fn is_checked(env: &dyn TypeEnv, exc: &Type) -> bool {
    !is_unchecked(env, exc)
}

/// Is `exc` a subtype of some member of `set`?
pub fn subset(env: &dyn TypeEnv, exc: &Type, set: &[Type]) -> bool {
    set.iter().any(|t| is_subtype(env, exc, t))
}

/// Is `exc` related (either direction) to some member of `set`?
pub fn intersects(env: &dyn TypeEnv, exc: &Type, set: &[Type]) -> bool {
    set.iter()
        .any(|t| is_subtype(env, exc, t) || is_subtype(env, t, exc))
}

pub fn is_handled(env: &dyn TypeEnv, exc: &Type, handled: &[Type]) -> bool {
    is_unchecked(env, exc) || subset(env, exc, handled)
}

/// Adds `exc` unless it is already covered, evicting members it covers.
pub fn incl(env: &dyn TypeEnv, exc: &Type, set: &[Type]) -> Vec<Type> {
    if subset(env, exc, set) {
        return set.to_vec();
    }
    let mut out = excl(env, exc, set);
    out.push(exc.clone());
    out
}

/// Removes every member that is a subtype of `exc`.
pub fn excl(env: &dyn TypeEnv, exc: &Type, set: &[Type]) -> Vec<Type> {
    set.iter()
        .filter(|t| !is_subtype(env, t, exc))
        .cloned()
        .collect()
}

pub fn union(env: &dyn TypeEnv, a: &[Type], b: &[Type]) -> Vec<Type> {
    b.iter().fold(a.to_vec(), |acc, t| incl(env, t, &acc))
}

pub fn diff(env: &dyn TypeEnv, a: &[Type], b: &[Type]) -> Vec<Type> {
    b.iter().fold(a.to_vec(), |acc, t| excl(env, t, &acc))
}

/// Members of either set that are covered by the other set.
pub fn intersect(env: &dyn TypeEnv, a: &[Type], b: &[Type]) -> Vec<Type> {
    let mut out = Vec::new();
    for t in a {
        if subset(env, t, b) {
            out = incl(env, t, &out);
        }
    }
    for t in b {
        if subset(env, t, a) {
            out = incl(env, t, &out);
        }
    }
    out
}
