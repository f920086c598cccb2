//! Migration utilities for converting between storage backends
//!
//! Moves projects between YAML and SQLite, and imports or exports them as
//! JSON for interoperability.

use anyhow::{Context, Result};
use log::info;
use std::path::Path;

use super::traits::{check_owner, prepare_for_save, ProjectBackend};
use super::{SqliteBackend, YamlBackend};
use crate::models::ProjectsStore;
use crate::normalizer::normalize;

/// Migrates data from a YAML file to a SQLite database.
/// Returns the number of projects migrated.
pub fn migrate_yaml_to_sqlite<P1: AsRef<Path>, P2: AsRef<Path>>(
    yaml_path: P1,
    sqlite_path: P2,
) -> Result<usize> {
    let yaml_backend = YamlBackend::new(yaml_path);
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    migrate(&yaml_backend, &sqlite_backend)
}

/// Migrates data from a SQLite database to a YAML file.
/// Returns the number of projects migrated.
pub fn migrate_sqlite_to_yaml<P1: AsRef<Path>, P2: AsRef<Path>>(
    sqlite_path: P1,
    yaml_path: P2,
) -> Result<usize> {
    let sqlite_backend = SqliteBackend::new(sqlite_path)?;
    let yaml_backend = YamlBackend::new(yaml_path);
    migrate(&sqlite_backend, &yaml_backend)
}

/// Copies every project from `source` into `target`, replacing its contents
pub fn migrate(source: &dyn ProjectBackend, target: &dyn ProjectBackend) -> Result<usize> {
    let store = source
        .load()
        .with_context(|| format!("Failed to load {} database", source.backend_type()))?;

    target
        .save(&store)
        .with_context(|| format!("Failed to save to {} database", target.backend_type()))?;

    info!(
        "Migrated {} project(s) from {:?} to {:?}",
        store.projects.len(),
        source.path(),
        target.path()
    );
    Ok(store.projects.len())
}

/// Exports a ProjectsStore to a pretty-printed JSON file
pub fn export_to_json<P: AsRef<Path>>(store: &ProjectsStore, json_path: P) -> Result<()> {
    let json = serde_json::to_string_pretty(store).context("Failed to serialize to JSON")?;
    std::fs::write(json_path, json).context("Failed to write JSON file")?;
    Ok(())
}

/// Imports a ProjectsStore from a JSON file
pub fn import_from_json<P: AsRef<Path>>(json_path: P) -> Result<ProjectsStore> {
    let json = std::fs::read_to_string(json_path).context("Failed to read JSON file")?;
    let store: ProjectsStore = serde_json::from_str(&json).context("Failed to parse JSON")?;
    Ok(store)
}

/// Exports data from any backend to a JSON file
pub fn export_backend_to_json<P: AsRef<Path>>(
    backend: &dyn ProjectBackend,
    json_path: P,
) -> Result<()> {
    let store = backend.load()?;
    export_to_json(&store, json_path)
}

/// Imports projects from a JSON file into any backend on behalf of `user`,
/// replacing projects with the same id and keeping the rest. Every project
/// is prepared for storage like `save_project` does, and a stored project
/// owned by someone else is never replaced. Nothing is written unless every
/// project is accepted. Returns the number imported.
pub fn import_json_to_backend<P: AsRef<Path>>(
    json_path: P,
    backend: &dyn ProjectBackend,
    user: &str,
) -> Result<usize> {
    let imported = import_from_json(json_path)?;
    let mut store = backend.load()?;
    let count = imported.projects.len();
    for mut project in imported.projects {
        normalize(&mut project);
        if let Some(existing) = store.get(&project.id) {
            check_owner(existing, user)?;
            project.created_by = existing.created_by.clone();
        }
        prepare_for_save(&mut project)?;
        store.upsert(project);
    }
    backend.save(&store)?;
    info!("Imported {} project(s) into {:?}", count, backend.path());
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::demo_project;
    use crate::db::ShapeError;
    use crate::models::Project;
    use tempfile::{NamedTempFile, TempDir};

    fn project_named(app_name: &str, owner: &str) -> Project {
        let mut project = demo_project(owner).unwrap();
        project.app_name = app_name.to_string();
        project
    }

    fn store_with(app_name: &str) -> ProjectsStore {
        let mut store = ProjectsStore::new();
        store.upsert(project_named(app_name, "alice"));
        store
    }

    #[test]
    fn test_yaml_to_sqlite_migration() {
        let temp_dir = TempDir::new().unwrap();
        let yaml_path = temp_dir.path().join("projects.yaml");
        let sqlite_file = NamedTempFile::with_suffix(".db").unwrap();

        YamlBackend::new(&yaml_path).save(&store_with("Migration Test")).unwrap();

        let count = migrate_yaml_to_sqlite(&yaml_path, sqlite_file.path()).unwrap();
        assert_eq!(count, 1);

        let sqlite_backend = SqliteBackend::new(sqlite_file.path()).unwrap();
        let loaded = sqlite_backend.load().unwrap();
        assert_eq!(loaded.projects[0].app_name, "Migration Test");
    }

    #[test]
    fn test_sqlite_to_yaml_migration() {
        let sqlite_file = NamedTempFile::with_suffix(".db").unwrap();
        let temp_dir = TempDir::new().unwrap();
        let yaml_path = temp_dir.path().join("projects.yaml");

        SqliteBackend::new(sqlite_file.path())
            .unwrap()
            .save(&store_with("SQLite Test"))
            .unwrap();

        let count = migrate_sqlite_to_yaml(sqlite_file.path(), &yaml_path).unwrap();
        assert_eq!(count, 1);

        let loaded = YamlBackend::new(&yaml_path).load().unwrap();
        assert_eq!(loaded.projects[0].app_name, "SQLite Test");
    }

    #[test]
    fn test_json_export_import() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");

        let store = store_with("JSON Test");
        export_to_json(&store, &json_path).unwrap();

        let loaded = import_from_json(&json_path).unwrap();
        assert_eq!(loaded.projects[0].app_name, "JSON Test");
        assert_eq!(loaded.projects[0].id, store.projects[0].id);
    }

    #[test]
    fn test_import_merges_into_backend() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");
        let backend = YamlBackend::new(temp_dir.path().join("projects.yaml"));
        backend.save(&store_with("Existing")).unwrap();

        export_to_json(&store_with("Imported"), &json_path).unwrap();
        let count = import_json_to_backend(&json_path, &backend, "alice").unwrap();
        assert_eq!(count, 1);
        assert_eq!(backend.load().unwrap().projects.len(), 2);
    }

    #[test]
    fn test_import_never_replaces_another_users_project() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");
        let backend = YamlBackend::new(temp_dir.path().join("projects.yaml"));
        let original = backend.save_project(project_named("Library", "alice")).unwrap();

        let mut replacement = project_named("Hijacked", "mallory");
        replacement.id = original.id;
        let mut incoming = ProjectsStore::new();
        incoming.upsert(replacement);
        export_to_json(&incoming, &json_path).unwrap();

        let err = import_json_to_backend(&json_path, &backend, "mallory").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShapeError>(),
            Some(ShapeError::NotOwner { .. })
        ));

        let stored = backend.get_project(&original.id).unwrap().unwrap();
        assert_eq!(stored.created_by, "alice");
        assert_eq!(stored.app_name, "Library");
    }

    #[test]
    fn test_import_keeps_owner_when_replacing() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");
        let backend = YamlBackend::new(temp_dir.path().join("projects.yaml"));
        let original = backend.save_project(project_named("Library", "alice")).unwrap();

        let mut replacement = project_named("Library v2", "mallory");
        replacement.id = original.id;
        let mut incoming = ProjectsStore::new();
        incoming.upsert(replacement);
        export_to_json(&incoming, &json_path).unwrap();

        import_json_to_backend(&json_path, &backend, "alice").unwrap();
        let stored = backend.get_project(&original.id).unwrap().unwrap();
        assert_eq!(stored.app_name, "Library v2");
        assert_eq!(stored.created_by, "alice");
    }

    #[test]
    fn test_import_rejects_empty_projects() {
        let temp_dir = TempDir::new().unwrap();
        let json_path = temp_dir.path().join("export.json");
        let backend = YamlBackend::new(temp_dir.path().join("projects.yaml"));
        backend.save(&store_with("Existing")).unwrap();

        let mut incoming = ProjectsStore::new();
        incoming.upsert(project_named("Fine", "alice"));
        incoming.upsert(Project::new("Hollow", "", "alice"));
        export_to_json(&incoming, &json_path).unwrap();

        let err = import_json_to_backend(&json_path, &backend, "alice").unwrap_err();
        assert_eq!(
            err.downcast_ref::<ShapeError>(),
            Some(&ShapeError::NoEntities("Hollow".to_string()))
        );

        let names: Vec<String> = backend
            .load()
            .unwrap()
            .projects
            .into_iter()
            .map(|p| p.app_name)
            .collect();
        assert_eq!(names, vec!["Existing".to_string()]);
    }
}
