//! Database abstraction layer for ProtoSpirit projects
//!
//! This module provides a trait-based abstraction for storage backends,
//! allowing projects to live in a YAML file or a SQLite database behind
//! one interface.

mod migration;
mod sqlite_backend;
mod traits;
mod yaml_backend;

pub use migration::{
    export_backend_to_json, export_to_json, import_from_json, import_json_to_backend, migrate,
    migrate_sqlite_to_yaml, migrate_yaml_to_sqlite,
};
pub use sqlite_backend::SqliteBackend;
pub use traits::{
    prepare_for_save, validate_shape, BackendType, DatabaseConfig, DatabaseStats, ProjectBackend,
    ShapeError,
};
pub use yaml_backend::YamlBackend;

use anyhow::Result;
use log::debug;
use std::path::Path;

/// Creates a database backend based on the file extension or explicit type
pub fn create_backend(
    path: &Path,
    backend_type: Option<BackendType>,
) -> Result<Box<dyn ProjectBackend>> {
    let bt = backend_type.unwrap_or_else(|| BackendType::from_path(path));
    debug!("Opening {} backend at {:?}", bt, path);

    match bt {
        BackendType::Yaml => Ok(Box::new(YamlBackend::new(path))),
        BackendType::Sqlite => Ok(Box::new(SqliteBackend::new(path)?)),
    }
}

/// Opens the backend described by `config`, creating an empty store if
/// none exists yet
pub fn open_or_create(config: &DatabaseConfig) -> Result<Box<dyn ProjectBackend>> {
    let backend = create_backend(&config.path, Some(config.backend_type))?;
    backend.create_if_not_exists()?;
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_backend_by_extension() {
        let temp_dir = TempDir::new().unwrap();

        let yaml = create_backend(&temp_dir.path().join("p.yml"), None).unwrap();
        assert_eq!(yaml.backend_type(), BackendType::Yaml);

        let sqlite = create_backend(&temp_dir.path().join("p.sqlite"), None).unwrap();
        assert_eq!(sqlite.backend_type(), BackendType::Sqlite);

        let forced = create_backend(&temp_dir.path().join("p.data"), Some(BackendType::Sqlite))
            .unwrap();
        assert_eq!(forced.backend_type(), BackendType::Sqlite);
    }

    #[test]
    fn test_open_or_create() {
        let temp_dir = TempDir::new().unwrap();
        let config = DatabaseConfig::new(temp_dir.path().join("store/projects.yaml"), None);

        let backend = open_or_create(&config).unwrap();
        assert!(backend.exists());
        let stats = backend.stats().unwrap();
        assert_eq!(stats.project_count, 0);
        assert_eq!(stats.backend_type, BackendType::Yaml);
    }
}
