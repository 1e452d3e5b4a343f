//! Error types for the onboarding engine.

/// Fatal registry/schema mismatch errors.
///
/// A `ConfigurationError` means the field registry and a canonical schema
/// disagree — a bug in configuration, not in user data. It aborts the single
/// derivation or progress calculation that triggered it and is never
/// converted into a user-facing form error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("No field configuration registered for '{0}'")]
    UnknownField(String),

    #[error("Field '{parent}' has no sub-field configuration for '{sub_field}'")]
    UnknownSubField { parent: String, sub_field: String },

    #[error("Field '{parent}' is not an array-of-object field but path '{path}' drills into it")]
    NotAnArrayField { parent: String, path: String },

    #[error("Schema for '{field}' is neither scalar nor array-of-object after unwrapping")]
    UnsupportedShape { field: String },

    #[error("Field '{field}' resolves an array rule but its schema is scalar (or the reverse)")]
    RuleShapeMismatch { field: String },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, ConfigurationError>;
