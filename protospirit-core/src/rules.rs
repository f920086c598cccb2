//! Consistency rules for the project model
//!
//! Every mutation of entities, roles and features goes through the methods
//! in this module so that cross references (relationship targets, feature
//! targets, permissions and the per-role feature lists) never dangle.
//!
//! `Feature::permissions` is the single source of truth for access;
//! `Role::features` is regenerated from it after every change.

use log::debug;
use std::collections::HashSet;

use crate::error::ModelError;
use crate::models::{
    Entity, Feature, FeatureCategory, FeaturePermission, PermissionLevel, Project, Role,
};

/// Decides whether a feature belongs to the entity named `entity_name`.
///
/// Features carrying an explicit target (`entityTarget`,
/// `relationshipTarget` or `relatedEntities`) are matched on those fields
/// only. Features without one, typically converted from a plain list of
/// names, fall back to a case-insensitive substring match on the feature
/// name. The fallback can over- and under-match.
pub fn classify_feature_for_entity(feature: &Feature, entity_name: &str) -> bool {
    if entity_name.is_empty() {
        return false;
    }

    if feature.has_structured_target() {
        feature.entity_target.as_deref() == Some(entity_name)
            || feature.relationship_target.as_deref() == Some(entity_name)
            || feature.related_entities.iter().any(|e| e == entity_name)
    } else {
        feature
            .name
            .to_lowercase()
            .contains(&entity_name.to_lowercase())
    }
}

/// Turns a display name into a kebab-case identifier
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "feature".to_string()
    } else {
        slug
    }
}

/// Returns `base`, or `base-2`, `base-3`, ... if already taken
pub(crate) fn unique_feature_id(features: &[Feature], base: &str) -> String {
    let taken = |id: &str| features.iter().any(|f| f.id == id);
    if !taken(base) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Drops entries for unknown roles, merges duplicate entries for the same
/// role and reduces each entry to its single effective action
pub(crate) fn canonical_permissions(
    permissions: &[FeaturePermission],
    roles: &HashSet<&str>,
) -> Vec<FeaturePermission> {
    let mut out: Vec<FeaturePermission> = Vec::new();
    for perm in permissions {
        if !roles.contains(perm.role.as_str()) {
            continue;
        }
        let level = perm.level();
        match out.iter_mut().find(|p| p.role == perm.role) {
            Some(existing) => {
                let merged = existing.level().max(level);
                *existing = FeaturePermission::new(perm.role.clone(), merged);
            }
            None if level != PermissionLevel::None => {
                out.push(FeaturePermission::new(perm.role.clone(), level));
            }
            None => {}
        }
    }
    out
}

/// What an entity removal cascaded into
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityRemoval {
    pub entity: String,
    /// Relationships on other entities that pointed at the removed entity
    pub pruned_relationships: usize,
    /// IDs of features removed with the entity
    pub removed_features: Vec<String>,
}

impl Project {
    /// Names of the features `role` can access, in feature order
    pub fn role_features(&self, role: &str) -> Vec<String> {
        self.features
            .iter()
            .filter(|f| {
                f.permission_for(role)
                    .is_some_and(|p| p.level() != PermissionLevel::None)
            })
            .map(|f| f.name.clone())
            .collect()
    }

    /// Regenerates every `Role::features` list from the feature permissions
    pub fn sync_role_features(&mut self) {
        let derived: Vec<Vec<String>> = self
            .roles
            .iter()
            .map(|r| self.role_features(&r.name))
            .collect();
        for (role, features) in self.roles.iter_mut().zip(derived) {
            role.features = features;
        }
    }

    /// Silently drops every dangling reference in the project.
    ///
    /// Returns the number of repairs made; zero means the project was
    /// already consistent.
    pub fn repair(&mut self) -> usize {
        let entity_names: HashSet<String> = self.entities.iter().map(|e| e.name.clone()).collect();
        let mut repairs = 0;

        for entity in &mut self.entities {
            let owner = entity.name.clone();
            let before = entity.relationships.len();
            entity.relationships.retain(|r| {
                let known = entity_names.contains(&r.entity);
                if !known {
                    debug!("Dropping relationship {} -> {}: unknown entity", owner, r.entity);
                }
                known
            });
            repairs += before - entity.relationships.len();
        }

        self.features.retain(|f| {
            match f.related_entities.iter().find(|e| !entity_names.contains(*e)) {
                Some(missing) => {
                    debug!(
                        "Dropping relationship feature '{}': unknown entity '{}'",
                        f.id, missing
                    );
                    repairs += 1;
                    false
                }
                None => true,
            }
        });

        let role_names: HashSet<&str> = self.roles.iter().map(|r| r.name.as_str()).collect();
        for feature in &mut self.features {
            if let Some(target) = &feature.entity_target {
                if !entity_names.contains(target) {
                    debug!("Clearing entityTarget '{}' on feature '{}'", target, feature.id);
                    feature.entity_target = None;
                    repairs += 1;
                }
            }
            if let Some(target) = &feature.relationship_target {
                if !entity_names.contains(target) {
                    feature.relationship_target = None;
                    repairs += 1;
                }
            }

            let related = &feature.related_entities;
            let mut seen = HashSet::new();
            let before = feature.show_in_entity_lists.len();
            feature
                .show_in_entity_lists
                .retain(|e| related.contains(e) && seen.insert(e.clone()));
            repairs += before - feature.show_in_entity_lists.len();

            let permissions = canonical_permissions(&feature.permissions, &role_names);
            if permissions != feature.permissions {
                debug!("Normalized permissions on feature '{}'", feature.id);
                feature.permissions = permissions;
                repairs += 1;
            }
        }

        let before: Vec<Vec<String>> = self.roles.iter().map(|r| r.features.clone()).collect();
        self.sync_role_features();
        repairs += self
            .roles
            .iter()
            .zip(before)
            .filter(|(role, old)| &role.features != old)
            .count();

        repairs
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Adds a new entity. Relationships to unknown entities are dropped.
    pub fn add_entity(&mut self, mut entity: Entity) -> Result<(), ModelError> {
        let name = entity.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyEntityName);
        }
        if self.has_entity(&name) {
            return Err(ModelError::DuplicateEntity(name));
        }
        let mut seen = HashSet::new();
        for field in &entity.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ModelError::DuplicateField {
                    entity: name,
                    field: field.name.clone(),
                });
            }
        }

        entity.name = name;
        entity
            .relationships
            .retain(|r| r.entity == entity.name || self.has_entity(&r.entity));
        entity.metadata.is_new = true;
        debug!("Added entity '{}'", entity.name);
        self.entities.push(entity);
        Ok(())
    }

    /// Removes an entity, every relationship pointing at it and every
    /// feature that belongs to it
    pub fn remove_entity(&mut self, name: &str) -> Result<EntityRemoval, ModelError> {
        let pos = self
            .entities
            .iter()
            .position(|e| e.name == name)
            .ok_or_else(|| ModelError::EntityNotFound(name.to_string()))?;
        self.entities.remove(pos);

        let mut pruned_relationships = 0;
        for entity in &mut self.entities {
            let before = entity.relationships.len();
            entity.relationships.retain(|r| r.entity != name);
            pruned_relationships += before - entity.relationships.len();
        }

        let mut removed_features = Vec::new();
        self.features.retain(|f| {
            if classify_feature_for_entity(f, name) {
                removed_features.push(f.id.clone());
                false
            } else {
                true
            }
        });

        self.sync_role_features();
        debug!(
            "Removed entity '{}' ({} relationships, {} features)",
            name,
            pruned_relationships,
            removed_features.len()
        );

        Ok(EntityRemoval {
            entity: name.to_string(),
            pruned_relationships,
            removed_features,
        })
    }

    /// Renames an entity and rewrites every reference to it
    pub fn rename_entity(&mut self, old: &str, new: &str) -> Result<(), ModelError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ModelError::EmptyEntityName);
        }
        if !self.has_entity(old) {
            return Err(ModelError::EntityNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.has_entity(new) {
            return Err(ModelError::DuplicateEntity(new.to_string()));
        }

        let rename = |value: &mut String| {
            if *value == old {
                *value = new.to_string();
            }
        };

        for entity in &mut self.entities {
            rename(&mut entity.name);
            for rel in &mut entity.relationships {
                rename(&mut rel.entity);
            }
        }

        for feature in &mut self.features {
            if let Some(target) = feature.entity_target.as_mut() {
                rename(target);
            }
            if let Some(target) = feature.relationship_target.as_mut() {
                rename(target);
            }
            feature.related_entities.iter_mut().for_each(rename);
            feature.show_in_entity_lists.iter_mut().for_each(rename);
        }

        debug!("Renamed entity '{}' to '{}'", old, new);
        Ok(())
    }

    // =========================================================================
    // Roles
    // =========================================================================

    /// Adds a role. Names in `role.features` that match an existing feature
    /// are granted full access.
    pub fn add_role(&mut self, mut role: Role) -> Result<(), ModelError> {
        let name = role.name.trim().to_string();
        if name.is_empty() {
            return Err(ModelError::EmptyRoleName);
        }
        if self.has_role(&name) {
            return Err(ModelError::DuplicateRole(name));
        }

        role.name = name;
        let grants = std::mem::take(&mut role.features);
        let role_name = role.name.clone();
        self.roles.push(role);

        for grant in grants {
            if let Some(idx) = self.feature_index(&grant) {
                let feature = &mut self.features[idx];
                if feature.permission_for(&role_name).is_none() {
                    feature
                        .permissions
                        .push(FeaturePermission::new(role_name.clone(), PermissionLevel::Full));
                }
            }
        }

        self.sync_role_features();
        Ok(())
    }

    /// Removes a role and every permission granted to it.
    /// Returns the number of permission entries stripped.
    pub fn remove_role(&mut self, name: &str) -> Result<usize, ModelError> {
        let pos = self
            .roles
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| ModelError::RoleNotFound(name.to_string()))?;
        self.roles.remove(pos);

        let mut stripped = 0;
        for feature in &mut self.features {
            let before = feature.permissions.len();
            feature.permissions.retain(|p| p.role != name);
            stripped += before - feature.permissions.len();
        }

        debug!("Removed role '{}' ({} permissions)", name, stripped);
        Ok(stripped)
    }

    /// Renames a role and carries its permissions over
    pub fn rename_role(&mut self, old: &str, new: &str) -> Result<(), ModelError> {
        let new = new.trim();
        if new.is_empty() {
            return Err(ModelError::EmptyRoleName);
        }
        if !self.has_role(old) {
            return Err(ModelError::RoleNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        if self.has_role(new) {
            return Err(ModelError::DuplicateRole(new.to_string()));
        }

        for role in &mut self.roles {
            if role.name == old {
                role.name = new.to_string();
            }
        }
        for feature in &mut self.features {
            for perm in &mut feature.permissions {
                if perm.role == old {
                    perm.role = new.to_string();
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Features
    // =========================================================================

    /// Checks user-supplied feature data against the project, stripping
    /// what can be repaired and rejecting what cannot.
    /// `current_id` excludes the feature being edited from duplicate checks.
    fn validate_feature(
        &self,
        feature: &mut Feature,
        current_id: Option<&str>,
    ) -> Result<(), ModelError> {
        feature.name = feature.name.trim().to_string();
        if feature.name.is_empty() {
            return Err(ModelError::EmptyFeatureName);
        }

        let lower = feature.name.to_lowercase();
        let duplicate = self
            .features
            .iter()
            .any(|f| Some(f.id.as_str()) != current_id && f.name.to_lowercase() == lower);
        if duplicate {
            return Err(ModelError::DuplicateFeature(feature.name.clone()));
        }

        match feature.category {
            FeatureCategory::Relationship => {
                if feature.related_entities.len() != 2 {
                    return Err(ModelError::RelatedEntityCount(
                        feature.related_entities.len(),
                    ));
                }
                if let Some(missing) = feature
                    .related_entities
                    .iter()
                    .find(|e| !self.has_entity(e))
                {
                    return Err(ModelError::EntityNotFound(missing.clone()));
                }
            }
            FeatureCategory::Entity => {
                if let Some(target) = &feature.entity_target {
                    if !self.has_entity(target) {
                        return Err(ModelError::EntityNotFound(target.clone()));
                    }
                }
            }
        }

        let related = feature.related_entities.clone();
        let before = feature.show_in_entity_lists.len();
        feature.show_in_entity_lists.retain(|e| related.contains(e));
        if feature.show_in_entity_lists.len() != before {
            debug!(
                "Stripped showInEntityLists entries outside relatedEntities on '{}'",
                feature.name
            );
        }

        let roles: HashSet<&str> = self.roles.iter().map(|r| r.name.as_str()).collect();
        feature.permissions = canonical_permissions(&feature.permissions, &roles);
        Ok(())
    }

    /// Adds a feature after validation; returns its (possibly generated) ID
    pub fn add_feature(&mut self, mut feature: Feature) -> Result<String, ModelError> {
        self.validate_feature(&mut feature, None)?;

        feature.id = feature.id.trim().to_string();
        if feature.id.is_empty() {
            feature.id = unique_feature_id(&self.features, &slugify(&feature.name));
        } else if self.features.iter().any(|f| f.id == feature.id) {
            return Err(ModelError::DuplicateFeatureId(feature.id));
        }

        let id = feature.id.clone();
        self.features.push(feature);
        self.sync_role_features();
        Ok(id)
    }

    /// Replaces a feature's definition, keeping its ID
    pub fn update_feature(&mut self, id_or_name: &str, mut feature: Feature) -> Result<(), ModelError> {
        let idx = self
            .feature_index(id_or_name)
            .ok_or_else(|| ModelError::FeatureNotFound(id_or_name.to_string()))?;
        let id = self.features[idx].id.clone();

        self.validate_feature(&mut feature, Some(&id))?;
        feature.id = id;
        self.features[idx] = feature;
        self.sync_role_features();
        Ok(())
    }

    /// Removes a feature; it disappears from every role's feature list
    pub fn remove_feature(&mut self, id_or_name: &str) -> Result<Feature, ModelError> {
        let idx = self
            .feature_index(id_or_name)
            .ok_or_else(|| ModelError::FeatureNotFound(id_or_name.to_string()))?;
        let removed = self.features.remove(idx);
        self.sync_role_features();
        debug!("Removed feature '{}'", removed.id);
        Ok(removed)
    }

    /// Sets one role's access to one feature.
    ///
    /// `None` removes the role's entry; any other level replaces it with a
    /// single action. The role's feature list follows.
    pub fn set_permission(
        &mut self,
        role: &str,
        feature: &str,
        level: PermissionLevel,
    ) -> Result<(), ModelError> {
        if !self.has_role(role) {
            return Err(ModelError::RoleNotFound(role.to_string()));
        }
        let idx = self
            .feature_index(feature)
            .ok_or_else(|| ModelError::FeatureNotFound(feature.to_string()))?;

        let feature = &mut self.features[idx];
        match level.action() {
            None => feature.permissions.retain(|p| p.role != role),
            Some(action) => match feature.permissions.iter_mut().find(|p| p.role == role) {
                Some(existing) => existing.actions = vec![action],
                None => feature.permissions.push(FeaturePermission {
                    role: role.to_string(),
                    actions: vec![action],
                }),
            },
        }

        self.sync_role_features();
        Ok(())
    }

    // =========================================================================
    // Soft deletes
    // =========================================================================

    /// Drops entities, fields and relationships marked `isRemoved`,
    /// cascading entity removals, and clears `isNew` markers.
    /// Returns the number of entities removed.
    pub fn purge_soft_deleted(&mut self) -> usize {
        let removed: Vec<String> = self
            .entities
            .iter()
            .filter(|e| e.metadata.is_removed)
            .map(|e| e.name.clone())
            .collect();

        for name in &removed {
            // The entity was found above, so removal cannot fail
            let _ = self.remove_entity(name);
        }

        for entity in &mut self.entities {
            entity.fields.retain(|f| !f.is_removed);
            entity.relationships.retain(|r| !r.is_removed);
            entity.metadata.is_new = false;
        }

        removed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityField, FieldType, RelationshipType};

    fn school() -> Project {
        let mut project = Project::new("School", "Course enrollment", "alice");
        project.entities = vec![
            Entity::new("Student")
                .with_field(EntityField::new("name", FieldType::Text).required())
                .with_relationship(RelationshipType::ManyToMany, "Course"),
            Entity::new("Course")
                .with_field(EntityField::new("title", FieldType::Text))
                .with_relationship(RelationshipType::ManyToMany, "Student"),
        ];
        project.roles = vec![
            Role::new("Admin", "Runs the school"),
            Role::new("Student", "Attends courses"),
        ];
        project.features = vec![
            Feature::relationship("f1", "Enroll Students", "Student", "Course")
                .with_permission("Admin", PermissionLevel::Full),
            Feature::entity("manage-students", "Manage Students", "Student")
                .with_permission("Admin", PermissionLevel::Full)
                .with_permission("Student", PermissionLevel::Read),
        ];
        project.features[0].show_in_entity_lists = vec!["Student".to_string()];
        project.sync_role_features();
        project
    }

    #[test]
    fn test_classify_prefers_structured_fields() {
        let structured = Feature::entity("x", "Grade Reports", "Course");
        assert!(classify_feature_for_entity(&structured, "Course"));
        // Name mentions Grade but the target says Course
        assert!(!classify_feature_for_entity(&structured, "Grade"));

        let legacy = Feature {
            id: "feature_1".to_string(),
            name: "Manage Orders".to_string(),
            ..Default::default()
        };
        assert!(classify_feature_for_entity(&legacy, "Order"));
        assert!(!classify_feature_for_entity(&legacy, "Invoice"));
        assert!(!classify_feature_for_entity(&legacy, ""));
    }

    #[test]
    fn test_remove_entity_cascades() {
        let mut project = school();
        let removal = project.remove_entity("Course").unwrap();

        assert_eq!(removal.pruned_relationships, 1);
        assert_eq!(removal.removed_features, vec!["f1".to_string()]);
        assert!(project.feature("f1").is_none());
        assert!(project.entity("Student").unwrap().relationships.is_empty());
        assert!(project.feature("manage-students").is_some());
        for feature in &project.features {
            assert_ne!(feature.entity_target.as_deref(), Some("Course"));
            assert!(!feature.related_entities.contains(&"Course".to_string()));
        }
        let admin = project.role("Admin").unwrap();
        assert_eq!(admin.features, vec!["Manage Students".to_string()]);
    }

    #[test]
    fn test_remove_entity_uses_name_heuristic_for_untargeted_features() {
        let mut project = school();
        project.features.push(Feature {
            id: "feature_3".to_string(),
            name: "Browse course catalog".to_string(),
            ..Default::default()
        });
        let removal = project.remove_entity("Course").unwrap();
        assert!(removal.removed_features.contains(&"feature_3".to_string()));
    }

    #[test]
    fn test_remove_unknown_entity_fails() {
        let mut project = school();
        assert_eq!(
            project.remove_entity("Teacher"),
            Err(ModelError::EntityNotFound("Teacher".to_string()))
        );
    }

    #[test]
    fn test_remove_role_strips_permissions() {
        let mut project = school();
        let stripped = project.remove_role("Admin").unwrap();
        assert_eq!(stripped, 2);
        for feature in &project.features {
            assert!(feature.permissions.iter().all(|p| p.role != "Admin"));
        }
        assert_eq!(project.roles.len(), 1);
    }

    #[test]
    fn test_remove_feature_updates_roles() {
        let mut project = school();
        assert!(project
            .role("Admin")
            .unwrap()
            .features
            .contains(&"Enroll Students".to_string()));

        let removed = project.remove_feature("f1").unwrap();
        assert_eq!(removed.name, "Enroll Students");
        for role in &project.roles {
            assert!(!role.features.contains(&"Enroll Students".to_string()));
        }
    }

    #[test]
    fn test_set_permission_round_trip() {
        let mut project = school();
        project
            .set_permission("Student", "f1", PermissionLevel::Full)
            .unwrap();
        assert_eq!(project.permission("Student", "f1"), PermissionLevel::Full);
        assert!(project
            .role("Student")
            .unwrap()
            .features
            .contains(&"Enroll Students".to_string()));

        project
            .set_permission("Student", "f1", PermissionLevel::None)
            .unwrap();
        assert_eq!(project.permission("Student", "f1"), PermissionLevel::None);
        assert!(!project
            .role("Student")
            .unwrap()
            .features
            .contains(&"Enroll Students".to_string()));
    }

    #[test]
    fn test_set_permission_overwrites_single_action() {
        let mut project = school();
        project
            .set_permission("Admin", "manage-students", PermissionLevel::Read)
            .unwrap();
        let perm = project
            .feature("manage-students")
            .unwrap()
            .permission_for("Admin")
            .unwrap();
        assert_eq!(perm.actions, vec![crate::models::Action::Read]);
    }

    #[test]
    fn test_set_permission_by_feature_name() {
        let mut project = school();
        project
            .set_permission("Student", "Enroll Students", PermissionLevel::Read)
            .unwrap();
        assert_eq!(project.permission("Student", "f1"), PermissionLevel::Read);
    }

    #[test]
    fn test_set_permission_unknown_references() {
        let mut project = school();
        assert_eq!(
            project.set_permission("Teacher", "f1", PermissionLevel::Read),
            Err(ModelError::RoleNotFound("Teacher".to_string()))
        );
        assert_eq!(
            project.set_permission("Admin", "nope", PermissionLevel::Read),
            Err(ModelError::FeatureNotFound("nope".to_string()))
        );
    }

    #[test]
    fn test_rename_entity_cascades() {
        let mut project = school();
        project.rename_entity("Course", "Class").unwrap();

        assert!(project.has_entity("Class"));
        assert!(project.entity("Student").unwrap().relates_to("Class"));
        let f1 = project.feature("f1").unwrap();
        assert_eq!(f1.related_entities, vec!["Student", "Class"]);

        project.rename_entity("Student", "Pupil").unwrap();
        let f1 = project.feature("f1").unwrap();
        assert_eq!(f1.show_in_entity_lists, vec!["Pupil"]);
        assert_eq!(
            project.feature("manage-students").unwrap().entity_target.as_deref(),
            Some("Pupil")
        );
    }

    #[test]
    fn test_rename_entity_rejects_collisions() {
        let mut project = school();
        assert_eq!(
            project.rename_entity("Course", "Student"),
            Err(ModelError::DuplicateEntity("Student".to_string()))
        );
        assert_eq!(
            project.rename_entity("Course", "  "),
            Err(ModelError::EmptyEntityName)
        );
    }

    #[test]
    fn test_rename_role_keeps_permissions() {
        let mut project = school();
        project.rename_role("Admin", "Principal").unwrap();
        assert_eq!(project.permission("Principal", "f1"), PermissionLevel::Full);
        assert_eq!(project.permission("Admin", "f1"), PermissionLevel::None);
    }

    #[test]
    fn test_add_feature_rejects_duplicate_name() {
        let mut project = school();
        let err = project
            .add_feature(Feature::entity("", "manage students", "Student"))
            .unwrap_err();
        assert_eq!(err, ModelError::DuplicateFeature("manage students".to_string()));
    }

    #[test]
    fn test_add_relationship_feature_requires_two_entities() {
        let mut project = school();
        let mut feature = Feature::relationship("", "Link", "Student", "Course");
        feature.related_entities.pop();
        assert_eq!(
            project.add_feature(feature),
            Err(ModelError::RelatedEntityCount(1))
        );
    }

    #[test]
    fn test_add_feature_strips_show_in_lists_and_generates_id() {
        let mut project = school();
        let mut feature = Feature::relationship("", "Assign Mentor", "Student", "Course");
        feature.show_in_entity_lists = vec!["Course".to_string(), "Teacher".to_string()];
        let feature = feature
            .with_permission("Admin", PermissionLevel::Full)
            .with_permission("Ghost", PermissionLevel::Read);

        let id = project.add_feature(feature).unwrap();
        assert_eq!(id, "assign-mentor");
        let added = project.feature(&id).unwrap();
        assert_eq!(added.show_in_entity_lists, vec!["Course"]);
        assert_eq!(added.permissions.len(), 1);
        assert!(project
            .role("Admin")
            .unwrap()
            .features
            .contains(&"Assign Mentor".to_string()));
    }

    #[test]
    fn test_add_feature_unknown_target() {
        let mut project = school();
        assert_eq!(
            project.add_feature(Feature::entity("", "Grade Papers", "Paper")),
            Err(ModelError::EntityNotFound("Paper".to_string()))
        );
    }

    #[test]
    fn test_update_feature_keeps_id_and_allows_same_name() {
        let mut project = school();
        let mut edited = project.feature("f1").unwrap().clone();
        edited.id = "ignored".to_string();
        edited.description = "Put students in courses".to_string();
        project.update_feature("f1", edited).unwrap();

        let f1 = project.feature("f1").unwrap();
        assert_eq!(f1.description, "Put students in courses");
    }

    #[test]
    fn test_add_role_grants_listed_features() {
        let mut project = school();
        let mut teacher = Role::new("Teacher", "Teaches");
        teacher.features = vec!["f1".to_string(), "Unknown".to_string()];
        project.add_role(teacher).unwrap();

        assert_eq!(project.permission("Teacher", "f1"), PermissionLevel::Full);
        assert_eq!(
            project.role("Teacher").unwrap().features,
            vec!["Enroll Students".to_string()]
        );
        assert_eq!(
            project.add_role(Role::new("Admin", "")),
            Err(ModelError::DuplicateRole("Admin".to_string()))
        );
    }

    #[test]
    fn test_add_entity_validation() {
        let mut project = school();
        assert_eq!(
            project.add_entity(Entity::new("Course")),
            Err(ModelError::DuplicateEntity("Course".to_string()))
        );
        let teacher = Entity::new("Teacher")
            .with_relationship(RelationshipType::OneToMany, "Course")
            .with_relationship(RelationshipType::OneToMany, "Building");
        project.add_entity(teacher).unwrap();
        let teacher = project.entity("Teacher").unwrap();
        assert_eq!(teacher.relationships.len(), 1);
        assert!(teacher.metadata.is_new);
    }

    #[test]
    fn test_repair_drops_dangling_references() {
        let mut project = school();
        project.entities[0]
            .relationships
            .push(crate::models::EntityRelationship::new(
                RelationshipType::OneToOne,
                "Locker",
            ));
        project.features.push(
            Feature::relationship("f9", "Assign Locker", "Student", "Locker")
                .with_permission("Admin", PermissionLevel::Full),
        );
        project.features[1]
            .permissions
            .push(FeaturePermission::new("Janitor", PermissionLevel::Read));
        project.roles[0].features.push("Nothing".to_string());

        assert!(project.repair() > 0);
        assert!(!project.entity("Student").unwrap().relates_to("Locker"));
        assert!(project.feature("f9").is_none());
        assert!(project.features[1].permission_for("Janitor").is_none());
        assert!(!project.roles[0].features.contains(&"Nothing".to_string()));
        assert_eq!(project.repair(), 0);
    }

    #[test]
    fn test_purge_soft_deleted() {
        let mut project = school();
        project.entities[0].fields[0].is_removed = true;
        project.entity_mut("Course").unwrap().metadata.is_removed = true;

        assert_eq!(project.purge_soft_deleted(), 1);
        assert!(!project.has_entity("Course"));
        assert!(project.feature("f1").is_none());
        let student = project.entity("Student").unwrap();
        assert!(student.fields.is_empty());
        assert!(student.relationships.is_empty());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Manage Orders"), "manage-orders");
        assert_eq!(slugify("  Assign -- Mentor! "), "assign-mentor");
        assert_eq!(slugify("***"), "feature");
    }
}
