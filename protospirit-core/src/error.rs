//! Validation errors surfaced to the user.
//!
//! Structural problems (dangling references, duplicate permission entries)
//! are repaired silently; only input the user can fix ends up here.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Entity name cannot be empty")]
    EmptyEntityName,

    #[error("Entity '{0}' already exists")]
    DuplicateEntity(String),

    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    #[error("Role name cannot be empty")]
    EmptyRoleName,

    #[error("Role '{0}' already exists")]
    DuplicateRole(String),

    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Feature name cannot be empty")]
    EmptyFeatureName,

    #[error("A feature named '{0}' already exists")]
    DuplicateFeature(String),

    #[error("Feature ID '{0}' is already in use")]
    DuplicateFeatureId(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Relationship features must connect exactly two entities (got {0})")]
    RelatedEntityCount(usize),

    #[error("Field name cannot be empty")]
    EmptyFieldName,

    #[error("Field '{field}' already exists on entity '{entity}'")]
    DuplicateField { entity: String, field: String },

    #[error("Field index {0} is out of range")]
    FieldIndexOutOfRange(usize),

    #[error("Relationship index {0} is out of range")]
    RelationshipIndexOutOfRange(usize),
}
