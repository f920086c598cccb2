pub mod ai;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod graph;
pub mod input;
pub mod matrix;
pub mod models;
pub mod normalizer;
pub mod rules;
pub mod samples;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use ai::{AiClient, AiError, AiMode};
pub use bootstrap::{demo_project, startup, App};
pub use config::AppConfig;
pub use db::{
    create_backend, BackendType, DatabaseConfig, ProjectBackend, ShapeError, SqliteBackend,
    YamlBackend,
};
pub use error::ModelError;
pub use export::ExportFormat;
pub use graph::{edge_key, relationship_edges, RelationshipEdge};
pub use input::{FeatureInput, RawEntity, RawFeature, RawProject, RawRole};
pub use matrix::PermissionMatrix;
pub use models::{
    Action,
    Entity,
    EntityField,
    EntityMetadata,
    EntityRelationship,
    ExampleRecord,
    Feature,
    FeatureCategory,
    FeaturePermission,
    FieldType,
    FieldValidation,
    JunctionSuggestion,
    PermissionLevel,
    Project,
    ProjectsStore,
    RelationshipType,
    Role,
};
pub use normalizer::{normalize, normalize_project};
pub use rules::{classify_feature_for_entity, slugify, EntityRemoval};
pub use session::EditSession;
pub use storage::Storage;
