//! YAML file storage backend
//!
//! This backend stores all projects in a single YAML file, using the
//! Storage implementation with file locking support.

use anyhow::Result;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::traits::{prepare_for_save, BackendType, ProjectBackend, ShapeError};
use crate::models::{Project, ProjectsStore};
use crate::storage::Storage;

/// YAML file backend implementation
pub struct YamlBackend {
    storage: Storage,
    path: PathBuf,
}

impl YamlBackend {
    /// Creates a new YAML backend for the given file path
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            storage: Storage::new(&path),
            path,
        }
    }

    /// Gets a reference to the underlying Storage
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl ProjectBackend for YamlBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Yaml
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ProjectsStore> {
        self.storage.load()
    }

    fn save(&self, store: &ProjectsStore) -> Result<()> {
        self.storage.save(store)
    }

    /// Read-modify-write under a single exclusive lock
    fn update_project(
        &self,
        id: &Uuid,
        user: &str,
        update: &mut dyn FnMut(&mut Project) -> Result<()>,
    ) -> Result<Project> {
        self.storage.update_atomically(|store| {
            let project = store
                .projects
                .iter_mut()
                .find(|p| &p.id == id)
                .ok_or(ShapeError::ProjectNotFound(*id))?;
            if project.created_by != user {
                return Err(ShapeError::NotOwner {
                    app: project.app_name.clone(),
                    owner: project.created_by.clone(),
                    user: user.to_string(),
                }
                .into());
            }

            let mut updated = project.clone();
            update(&mut updated)?;
            prepare_for_save(&mut updated)?;
            *project = updated.clone();
            Ok(updated)
        })
    }
}
