//! Error types for the policy engine.

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("create constraint violated: {0}")]
    CreateConstraintViolation(String),
    #[error("role '{role}' may not mutate immutable label '{key}'")]
    ImmutableKeyViolation { role: String, key: String },
}
