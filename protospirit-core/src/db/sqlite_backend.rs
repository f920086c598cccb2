//! SQLite database storage backend
//!
//! Stores one row per project, with the model itself kept as a JSON column
//! and the listing fields (name, owner, timestamps) alongside it.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::traits::{prepare_for_save, BackendType, ProjectBackend, ShapeError};
use crate::models::{Project, ProjectsStore};
use crate::normalizer;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite backend implementation
pub struct SqliteBackend {
    path: PathBuf,
    conn: Mutex<Connection>,
}

/// A project row before its model column is decoded
struct ProjectRow {
    id: String,
    model: String,
}

impl ProjectRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            model: row.get(1)?,
        })
    }
}

impl SqliteBackend {
    /// Creates a new SQLite backend
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open SQLite database {:?}", path))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        let backend = Self {
            path,
            conn: Mutex::new(conn),
        };

        backend.init_schema()?;
        Ok(backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection lock poisoned"))
    }

    /// Initialize the database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;

        // A missing table reads as version 0
        let current_version: i32 = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(include_str!("schema.sql"))?;
        } else if current_version < SCHEMA_VERSION {
            anyhow::bail!(
                "Database schema version {} is outdated, expected {}",
                current_version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    /// Serializes a project model for storage
    fn to_json(project: &Project) -> Result<String> {
        serde_json::to_string(project).context("Failed to serialize project to JSON")
    }

    /// Decodes a stored model and brings it into canonical form
    fn from_row(row: ProjectRow) -> Result<Project> {
        let mut project: Project = serde_json::from_str(&row.model)
            .with_context(|| format!("Failed to deserialize project {}", row.id))?;
        normalizer::normalize(&mut project);
        Ok(project)
    }

    fn timestamp(at: &DateTime<Utc>) -> String {
        at.to_rfc3339()
    }

    fn write_project(conn: &Connection, project: &Project) -> Result<()> {
        conn.execute(
            "INSERT OR REPLACE INTO projects (id, app_name, created_by, created_at, modified_at, model)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                project.id.to_string(),
                project.app_name,
                project.created_by,
                Self::timestamp(&project.created_at),
                Self::timestamp(&project.modified_at),
                Self::to_json(project)?,
            ],
        )?;
        Ok(())
    }

    fn read_project(conn: &Connection, id: &Uuid) -> Result<Option<Project>> {
        let row = conn
            .query_row(
                "SELECT id, model FROM projects WHERE id = ?1",
                params![id.to_string()],
                ProjectRow::from_row,
            )
            .optional()?;
        row.map(Self::from_row).transpose()
    }

    fn read_projects(conn: &Connection, owner: Option<&str>) -> Result<Vec<Project>> {
        let mut stmt = conn.prepare(
            "SELECT id, model FROM projects
             WHERE ?1 IS NULL OR created_by = ?1
             ORDER BY created_at, app_name",
        )?;
        let rows = stmt
            .query_map(params![owner], ProjectRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows.into_iter().map(Self::from_row).collect()
    }
}

fn owner_mismatch(project: &Project, user: &str) -> Option<ShapeError> {
    (project.created_by != user).then(|| ShapeError::NotOwner {
        app: project.app_name.clone(),
        owner: project.created_by.clone(),
        user: user.to_string(),
    })
}

impl ProjectBackend for SqliteBackend {
    fn backend_type(&self) -> BackendType {
        BackendType::Sqlite
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<ProjectsStore> {
        let conn = self.conn()?;
        Ok(ProjectsStore {
            projects: Self::read_projects(&conn, None)?,
        })
    }

    fn save(&self, store: &ProjectsStore) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM projects", [])?;
        for project in &store.projects {
            Self::write_project(&tx, project)?;
        }

        tx.commit()?;
        Ok(())
    }

    // Per-project overrides touch a single row

    fn get_project(&self, id: &Uuid) -> Result<Option<Project>> {
        let conn = self.conn()?;
        Self::read_project(&conn, id)
    }

    fn list_projects(&self, owner: Option<&str>) -> Result<Vec<Project>> {
        let conn = self.conn()?;
        Self::read_projects(&conn, owner)
    }

    fn save_project(&self, project: Project) -> Result<Project> {
        let mut project = project;
        prepare_for_save(&mut project)?;
        let conn = self.conn()?;
        Self::write_project(&conn, &project)?;
        info!("Saved project '{}' ({})", project.app_name, project.id);
        Ok(project)
    }

    fn delete_project(&self, id: &Uuid, user: &str) -> Result<Project> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let project = Self::read_project(&tx, id)?.ok_or(ShapeError::ProjectNotFound(*id))?;
        if let Some(err) = owner_mismatch(&project, user) {
            return Err(err.into());
        }
        tx.execute("DELETE FROM projects WHERE id = ?1", params![id.to_string()])?;
        tx.commit()?;

        info!("Deleted project '{}' ({})", project.app_name, project.id);
        Ok(project)
    }

    fn update_project(
        &self,
        id: &Uuid,
        user: &str,
        update: &mut dyn FnMut(&mut Project) -> Result<()>,
    ) -> Result<Project> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let mut project = Self::read_project(&tx, id)?.ok_or(ShapeError::ProjectNotFound(*id))?;
        if let Some(err) = owner_mismatch(&project, user) {
            return Err(err.into());
        }
        update(&mut project)?;
        prepare_for_save(&mut project)?;
        Self::write_project(&tx, &project)?;

        tx.commit()?;
        Ok(project)
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }
}
