//! Label-scope expression compiler and evaluator.
//!
//! A scope expression is a small boolean DSL over a state's label map, e.g.
//! `env == "dev" and team == "platform"`. It supports `==`, `!=`, `<`, `<=`,
//! `>`, `>=`, `matches` (regex on strings), the connectors `and`/`or`/`not`,
//! and parentheses. There is no `in` operator — express alternatives as `or`
//! chains.
//!
//! Missing label keys are "undefined": any comparison against an undefined
//! key evaluates to `false`, but this does not short-circuit the surrounding
//! expression — an `or` with an undefined left side still evaluates its right
//! side normally. The empty expression string always evaluates to `true`.
//!
//! Compilation is cheap to cache because expressions are typically reused
//! across many requests (a role's `scope_expr` is fixed until edited); use
//! [`ScopeCache`] to compile once per distinct expression string.

mod ast;
mod cache;
mod error;
mod eval;
mod parser;
mod value;

pub use cache::ScopeCache;
pub use error::ScopeError;
pub use eval::Evaluator;
pub use value::{LabelMap, LabelValue};

/// Compile a scope expression string without caching. Most callers should
/// prefer [`ScopeCache::compile`], which memoizes by expression string.
pub fn compile(expr: &str) -> Result<Evaluator, ScopeError> {
    let ast = parser::parse(expr)?;
    Evaluator::new(expr.to_string(), &ast)
}

pub mod prelude {
    pub use crate::{compile, Evaluator, LabelMap, LabelValue, ScopeCache, ScopeError};
}
