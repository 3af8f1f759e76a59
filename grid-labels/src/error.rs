/// Errors raised while compiling a scope expression string.
///
/// Never raised during evaluation — evaluation always yields a `bool`; see
/// [`crate::Evaluator::evaluate`].
#[derive(Debug, thiserror::Error)]
pub enum ScopeError {
    #[error("invalid scope expression syntax: {0}")]
    Syntax(String),
    #[error("invalid regex pattern in 'matches' clause: {0}")]
    InvalidRegex(String),
}
