//! Database abstraction traits
//!
//! This module defines the core trait that all storage backends must implement,
//! plus the shape checks every project passes before it is persisted.

use anyhow::Result;
use log::info;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Project, ProjectsStore};

/// Types of database backends available
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// YAML file storage (single file)
    Yaml,
    /// SQLite database storage
    Sqlite,
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::Yaml => write!(f, "YAML"),
            BackendType::Sqlite => write!(f, "SQLite"),
        }
    }
}

impl BackendType {
    /// Parses a backend name as written in the config file
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(BackendType::Yaml),
            "sqlite" | "sqlite3" | "db" => Some(BackendType::Sqlite),
            _ => None,
        }
    }

    /// Infers the backend from a file extension, defaulting to YAML
    pub fn from_path(path: &std::path::Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("db") | Some("sqlite") | Some("sqlite3") => BackendType::Sqlite,
            _ => BackendType::Yaml,
        }
    }
}

/// Configuration for database backends
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file
    pub path: PathBuf,
    /// Backend type
    pub backend_type: BackendType,
}

impl DatabaseConfig {
    pub fn new(path: PathBuf, backend_type: Option<BackendType>) -> Self {
        let backend_type = backend_type.unwrap_or_else(|| BackendType::from_path(&path));
        Self { path, backend_type }
    }
}

/// Reasons a project is refused at the persistence boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeError {
    #[error("project '{0}' has no entities")]
    NoEntities(String),
    #[error("project '{0}' has no roles")]
    NoRoles(String),
    #[error("project '{0}' has no features")]
    NoFeatures(String),
    #[error("project '{0}' contains an unnamed entity")]
    UnnamedEntity(String),
    #[error("project '{0}' contains an unnamed role")]
    UnnamedRole(String),
    #[error("project '{app}' belongs to '{owner}', not '{user}'")]
    NotOwner {
        app: String,
        owner: String,
        user: String,
    },
    #[error("project not found: {0}")]
    ProjectNotFound(Uuid),
}

/// Checks the minimum shape a persisted project must have
pub fn validate_shape(project: &Project) -> Result<(), ShapeError> {
    let app = || project.app_name.clone();
    if project.entities.is_empty() {
        return Err(ShapeError::NoEntities(app()));
    }
    if project.roles.is_empty() {
        return Err(ShapeError::NoRoles(app()));
    }
    if project.features.is_empty() {
        return Err(ShapeError::NoFeatures(app()));
    }
    if project.entities.iter().any(|e| e.name.trim().is_empty()) {
        return Err(ShapeError::UnnamedEntity(app()));
    }
    if project.roles.iter().any(|r| r.name.trim().is_empty()) {
        return Err(ShapeError::UnnamedRole(app()));
    }
    Ok(())
}

/// Gets a project ready to be written: soft-deleted items are purged, the
/// model is repaired and its shape checked, and `modifiedAt` is bumped.
pub fn prepare_for_save(project: &mut Project) -> Result<(), ShapeError> {
    let purged = project.purge_soft_deleted();
    if purged > 0 {
        info!("Purged {} soft-deleted item(s) from '{}'", purged, project.app_name);
    }
    project.repair();
    validate_shape(project)?;
    project.touch();
    Ok(())
}

pub(crate) fn check_owner(project: &Project, user: &str) -> Result<(), ShapeError> {
    if project.created_by != user {
        return Err(ShapeError::NotOwner {
            app: project.app_name.clone(),
            owner: project.created_by.clone(),
            user: user.to_string(),
        });
    }
    Ok(())
}

/// Core trait for database backends
///
/// `load()` and `save()` work with the full `ProjectsStore`; the per-project
/// operations have default implementations on top of them, which backends
/// may override with something more efficient.
pub trait ProjectBackend: Send + Sync {
    /// Returns the backend type
    fn backend_type(&self) -> BackendType;

    /// Returns the path to the database file
    fn path(&self) -> &std::path::Path;

    // =========================================================================
    // Full Store Operations
    // =========================================================================

    /// Loads every stored project
    fn load(&self) -> Result<ProjectsStore>;

    /// Replaces the stored projects with `store`
    fn save(&self, store: &ProjectsStore) -> Result<()>;

    // =========================================================================
    // Project Operations
    // =========================================================================

    /// Gets a project by its UUID
    fn get_project(&self, id: &Uuid) -> Result<Option<Project>> {
        Ok(self.load()?.get(id).cloned())
    }

    /// Finds a project by UUID or, failing that, by case-insensitive app name
    fn find_project(&self, key: &str) -> Result<Option<Project>> {
        if let Ok(id) = Uuid::parse_str(key.trim()) {
            return self.get_project(&id);
        }
        let wanted = key.trim().to_lowercase();
        let store = self.load()?;
        let mut matches = store
            .projects
            .into_iter()
            .filter(|p| p.app_name.to_lowercase() == wanted);
        let found = matches.next();
        if matches.next().is_some() {
            anyhow::bail!("More than one project is named '{}'; use its id", key.trim());
        }
        Ok(found)
    }

    /// Lists projects, optionally only those created by `owner`
    fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>> {
        let store = self.load()?;
        Ok(store
            .projects
            .into_iter()
            .filter(|p| owner.map_or(true, |o| p.created_by == o))
            .collect())
    }

    /// Inserts or replaces a project after preparing it for storage.
    /// Returns the project as written.
    fn save_project(&self, project: Project) -> Result<Project> {
        let mut project = project;
        prepare_for_save(&mut project)?;
        let mut store = self.load()?;
        store.upsert(project.clone());
        self.save(&store)?;
        info!("Saved project '{}' ({})", project.app_name, project.id);
        Ok(project)
    }

    /// Deletes a project; only its creator may do so
    fn delete_project(&self, id: &Uuid, user: &str) -> Result<Project> {
        let mut store = self.load()?;
        let project = store.get(id).ok_or(ShapeError::ProjectNotFound(*id))?;
        check_owner(project, user)?;
        let removed = store.remove(id).ok_or(ShapeError::ProjectNotFound(*id))?;
        self.save(&store)?;
        info!("Deleted project '{}' ({})", removed.app_name, removed.id);
        Ok(removed)
    }

    /// Applies `update` to a stored project on behalf of `user`, who must be
    /// its creator. Nothing is written when `update` fails.
    fn update_project(
        &self,
        id: &Uuid,
        user: &str,
        update: &mut dyn FnMut(&mut Project) -> Result<()>,
    ) -> Result<Project> {
        let mut store = self.load()?;
        let mut project = store
            .get(id)
            .cloned()
            .ok_or(ShapeError::ProjectNotFound(*id))?;
        check_owner(&project, user)?;
        update(&mut project)?;
        prepare_for_save(&mut project)?;
        store.upsert(project.clone());
        self.save(&store)?;
        Ok(project)
    }

    // =========================================================================
    // Utility Operations
    // =========================================================================

    /// Returns true if the database file exists
    fn exists(&self) -> bool {
        self.path().exists()
    }

    /// Creates an empty store if none exists yet
    fn create_if_not_exists(&self) -> Result<()> {
        if !self.exists() {
            self.save(&ProjectsStore::new())?;
        }
        Ok(())
    }

    /// Returns statistics about the database
    fn stats(&self) -> Result<DatabaseStats> {
        let store = self.load()?;
        Ok(DatabaseStats {
            project_count: store.projects.len(),
            entity_count: store.projects.iter().map(|p| p.entities.len()).sum(),
            feature_count: store.projects.iter().map(|p| p.features.len()).sum(),
            backend_type: self.backend_type(),
        })
    }
}

/// Statistics about a database
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub project_count: usize,
    pub entity_count: usize,
    pub feature_count: usize,
    pub backend_type: BackendType,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, Feature, PermissionLevel, Role};

    fn library() -> Project {
        let mut project = Project::new("Library", "", "alice");
        project.entities.push(Entity::new("Book"));
        project.roles.push(Role::new("Librarian", ""));
        project.features.push(
            Feature::entity("manage-books", "Manage Books", "Book")
                .with_permission("Librarian", PermissionLevel::Full),
        );
        project
    }

    #[test]
    fn test_validate_shape() {
        assert_eq!(validate_shape(&library()), Ok(()));

        let mut project = library();
        project.entities.clear();
        assert_eq!(
            validate_shape(&project),
            Err(ShapeError::NoEntities("Library".to_string()))
        );

        let mut project = library();
        project.roles.clear();
        assert!(matches!(validate_shape(&project), Err(ShapeError::NoRoles(_))));

        let mut project = library();
        project.features.clear();
        assert!(matches!(validate_shape(&project), Err(ShapeError::NoFeatures(_))));

        let mut project = library();
        project.entities.push(Entity::new(" "));
        assert!(matches!(validate_shape(&project), Err(ShapeError::UnnamedEntity(_))));
    }

    #[test]
    fn test_prepare_for_save_purges_and_touches() {
        let mut project = library();
        let mut gone = Entity::new("Shelf");
        gone.metadata.is_removed = true;
        project.entities.push(gone);
        let before = project.modified_at;

        prepare_for_save(&mut project).unwrap();
        assert_eq!(project.entity_names(), vec!["Book"]);
        assert!(project.modified_at >= before);
    }

    #[test]
    fn test_backend_type_inference() {
        assert_eq!(BackendType::from_path(std::path::Path::new("a.db")), BackendType::Sqlite);
        assert_eq!(BackendType::from_path(std::path::Path::new("a.yml")), BackendType::Yaml);
        assert_eq!(BackendType::from_path(std::path::Path::new("a")), BackendType::Yaml);
        assert_eq!(BackendType::parse("SQLite"), Some(BackendType::Sqlite));
        assert_eq!(BackendType::parse("json"), None);
    }
}
