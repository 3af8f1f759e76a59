use crate::error::ScopeError;
use crate::eval::Evaluator;
use crate::parser::parse;
use dashmap::DashMap;
use std::sync::Arc;

/// Thread-safe compile cache, keyed by the exact expression string.
///
/// Mirrors the shape of an in-memory TTL cache, but scope expressions are
/// cached indefinitely (parsing is pure and deterministic) — there is nothing
/// to expire until a role's `scope_expr` changes, at which point
/// [`ScopeCache::invalidate`] drops the stale entry explicitly.
#[derive(Default)]
pub struct ScopeCache {
    entries: DashMap<String, Arc<Evaluator>>,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Compile `expr`, or return the cached evaluator if this exact string was
    /// compiled before.
    pub fn compile(&self, expr: &str) -> Result<Arc<Evaluator>, ScopeError> {
        if let Some(hit) = self.entries.get(expr) {
            return Ok(hit.clone());
        }
        let ast = parse(expr)?;
        let evaluator = Arc::new(Evaluator::new(expr.to_string(), &ast)?);
        self.entries.insert(expr.to_string(), evaluator.clone());
        Ok(evaluator)
    }

    /// Remove a cached expression, e.g. after a role's `scope_expr` is edited.
    pub fn invalidate(&self, expr: &str) {
        self.entries.remove(expr);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::LabelValue;
    use std::collections::BTreeMap;

    #[test]
    fn compiles_once_and_reuses() {
        let cache = ScopeCache::new();
        let a = cache.compile("env == \"dev\"").unwrap();
        let b = cache.compile("env == \"dev\"").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn invalidate_forces_recompile() {
        let cache = ScopeCache::new();
        let a = cache.compile("env == \"dev\"").unwrap();
        cache.invalidate("env == \"dev\"");
        let b = cache.compile("env == \"dev\"").unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn bad_expression_surfaces_as_error_not_a_panic() {
        let cache = ScopeCache::new();
        assert!(cache.compile("env ===").is_err());
        let mut labels = BTreeMap::new();
        labels.insert("env".to_string(), LabelValue::Str("dev".to_string()));
        // A denied-by-default caller should treat the Err as a non-match.
    }
}
