use grid_labels::LabelValue;
use std::collections::{BTreeMap, BTreeSet};

/// A single `objectType:action` grant. Either side may be the wildcard `*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub object_type: String,
    pub action: String,
}

impl Grant {
    pub fn new(object_type: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            object_type: object_type.into(),
            action: action.into(),
        }
    }

    pub fn matches(&self, object_type: &str, action: &str) -> bool {
        (self.object_type == "*" || self.object_type == object_type)
            && (self.action == "*" || self.action == action)
    }

    /// Parse a grant from its stored `"objectType:action"` wire form.
    pub fn parse(s: &str) -> Option<Self> {
        let (object_type, action) = s.split_once(':')?;
        Some(Self::new(object_type, action))
    }
}

/// A per-key constraint on labels supplied at `state:create` time.
#[derive(Debug, Clone, Default)]
pub struct CreateConstraint {
    pub required: bool,
    /// Empty means any value is allowed (the key is merely recognized).
    pub allowed_values: Vec<LabelValue>,
}

/// An authorization role: a named bundle of grants, an optional label scope,
/// label-creation constraints, and a list of keys the role may never mutate.
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub description: String,
    /// Label-scope expression string; empty means unconstrained.
    pub scope_expr: String,
    pub create_constraints: BTreeMap<String, CreateConstraint>,
    pub immutable_keys: BTreeSet<String>,
    pub actions: Vec<Grant>,
    /// Optimistic-locking version; increments on any mutation.
    pub version: i64,
}

impl Role {
    pub fn grants(&self, object_type: &str, action: &str) -> bool {
        self.actions.iter().any(|g| g.matches(object_type, action))
    }
}

/// Supplies the full `Role` definitions for a set of role names.
///
/// Implementations typically sit in front of a repository-backed cache (role
/// definitions change rarely relative to request volume).
pub trait RoleCatalog: Send + Sync + 'static {
    fn roles_for(&self, names: &[String]) -> Vec<std::sync::Arc<Role>>;
}
