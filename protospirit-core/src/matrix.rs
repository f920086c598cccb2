//! Permission Matrix
//!
//! The role x feature grid. Levels are always computed from
//! `Feature::permissions`; toggling goes through `Project::set_permission`.

use serde::Serialize;

use crate::error::ModelError;
use crate::models::{PermissionLevel, Project};

impl Project {
    /// Effective access of `role` to the feature with the given ID or name.
    /// `full` wins over `read`; no entry means `none`.
    pub fn permission(&self, role: &str, feature: &str) -> PermissionLevel {
        self.feature(feature)
            .and_then(|f| f.permission_for(role))
            .map(|p| p.level())
            .unwrap_or_default()
    }

    /// Advances a cell through none -> read -> full -> none and returns the
    /// new level
    pub fn toggle_permission(
        &mut self,
        role: &str,
        feature: &str,
    ) -> Result<PermissionLevel, ModelError> {
        let next = self.permission(role, feature).next();
        self.set_permission(role, feature, next)?;
        Ok(next)
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MatrixColumn {
    pub id: String,
    pub name: String,
}

/// Snapshot of the grid, roles as rows and features as columns
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PermissionMatrix {
    pub roles: Vec<String>,
    pub features: Vec<MatrixColumn>,
    cells: Vec<Vec<PermissionLevel>>,
}

impl PermissionMatrix {
    pub fn from_project(project: &Project) -> Self {
        let roles: Vec<String> = project.roles.iter().map(|r| r.name.clone()).collect();
        let features = project
            .features
            .iter()
            .map(|f| MatrixColumn {
                id: f.id.clone(),
                name: f.name.clone(),
            })
            .collect();
        let cells = roles
            .iter()
            .map(|role| {
                project
                    .features
                    .iter()
                    .map(|f| f.permission_for(role).map(|p| p.level()).unwrap_or_default())
                    .collect()
            })
            .collect();

        Self {
            roles,
            features,
            cells,
        }
    }

    /// Level for a role and feature ID; `None` for unknown coordinates
    pub fn level(&self, role: &str, feature_id: &str) -> Option<PermissionLevel> {
        let row = self.roles.iter().position(|r| r == role)?;
        let col = self.features.iter().position(|f| f.id == feature_id)?;
        Some(self.cells[row][col])
    }

    /// Rows paired with their role names
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[PermissionLevel])> {
        self.roles
            .iter()
            .map(String::as_str)
            .zip(self.cells.iter().map(Vec::as_slice))
    }

    /// Number of (role, feature) pairs at each level: (none, read, full)
    pub fn counts(&self) -> (usize, usize, usize) {
        self.cells
            .iter()
            .flatten()
            .fold((0, 0, 0), |(n, r, f), level| match level {
                PermissionLevel::None => (n + 1, r, f),
                PermissionLevel::Read => (n, r + 1, f),
                PermissionLevel::Full => (n, r, f + 1),
            })
    }
}
