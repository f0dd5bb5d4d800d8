//! Namespace scope helpers.
//!
//! A view's namespace scope is a plain string. The empty string and
//! [`ALL_NAMESPACES`] both mean "every namespace"; anything else names a
//! single namespace.

/// Scope value selecting every namespace.
pub const ALL_NAMESPACES: &str = "all";

/// Scope value used before any namespace has been chosen.
pub const BLANK_NAMESPACE: &str = "";

/// Separator between the namespace and the name inside a row ID.
pub const PATH_SEPARATOR: char = '/';

/// Returns `true` when `namespace` spans every namespace.
#[inline]
#[must_use]
pub fn is_all_namespaces(namespace: &str) -> bool {
    namespace == ALL_NAMESPACES || namespace == BLANK_NAMESPACE
}

/// Returns `true` when `namespace` names exactly one namespace.
#[inline]
#[must_use]
pub fn is_namespaced(namespace: &str) -> bool { !is_all_namespaces(namespace) }

/// Builds a `namespace/name` path, or just `name` for cluster-scoped
/// resources.
#[must_use]
pub fn fqn(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        return name.to_string();
    }
    format!("{namespace}{PATH_SEPARATOR}{name}")
}

/// Splits a `namespace/name` path. Paths without a separator are treated as
/// cluster-scoped and yield an empty namespace.
#[must_use]
pub fn split_fqn(path: &str) -> (&str, &str) {
    path.split_once(PATH_SEPARATOR).unwrap_or(("", path))
}
