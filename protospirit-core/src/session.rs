//! Entity edit sessions
//!
//! Edits to an entity are staged: existing fields and relationships are
//! marked for removal (and can be un-marked), new ones are queued, and
//! nothing touches the project until `commit`.

use std::collections::{BTreeSet, HashSet};

use crate::error::ModelError;
use crate::models::{Entity, EntityField, EntityRelationship, Project};

#[derive(Debug, Clone)]
pub struct EditSession {
    base: Entity,
    description: Option<String>,
    removed_fields: BTreeSet<usize>,
    removed_relationships: BTreeSet<usize>,
    added_fields: Vec<EntityField>,
    added_relationships: Vec<EntityRelationship>,
}

impl EditSession {
    /// Starts editing the named entity
    pub fn begin(project: &Project, entity: &str) -> Result<Self, ModelError> {
        let base = project
            .entity(entity)
            .cloned()
            .ok_or_else(|| ModelError::EntityNotFound(entity.to_string()))?;
        Ok(Self {
            description: base.metadata.description.clone(),
            base,
            removed_fields: BTreeSet::new(),
            removed_relationships: BTreeSet::new(),
            added_fields: Vec::new(),
            added_relationships: Vec::new(),
        })
    }

    pub fn entity_name(&self) -> &str {
        &self.base.name
    }

    pub fn is_dirty(&self) -> bool {
        !self.removed_fields.is_empty()
            || !self.removed_relationships.is_empty()
            || !self.added_fields.is_empty()
            || !self.added_relationships.is_empty()
            || self.description != self.base.metadata.description
    }

    pub fn mark_field_removed(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.base.fields.len() {
            return Err(ModelError::FieldIndexOutOfRange(index));
        }
        self.removed_fields.insert(index);
        Ok(())
    }

    /// Returns false if the field was not marked
    pub fn cancel_field_removal(&mut self, index: usize) -> bool {
        self.removed_fields.remove(&index)
    }

    pub fn mark_relationship_removed(&mut self, index: usize) -> Result<(), ModelError> {
        if index >= self.base.relationships.len() {
            return Err(ModelError::RelationshipIndexOutOfRange(index));
        }
        self.removed_relationships.insert(index);
        Ok(())
    }

    pub fn cancel_relationship_removal(&mut self, index: usize) -> bool {
        self.removed_relationships.remove(&index)
    }

    fn kept_fields(&self) -> impl Iterator<Item = &EntityField> {
        self.base
            .fields
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.removed_fields.contains(i))
            .map(|(_, f)| f)
    }

    pub fn add_field(&mut self, field: EntityField) -> Result<(), ModelError> {
        if field.name.trim().is_empty() {
            return Err(ModelError::EmptyFieldName);
        }
        let taken = self
            .kept_fields()
            .chain(self.added_fields.iter())
            .any(|f| f.name == field.name);
        if taken {
            return Err(ModelError::DuplicateField {
                entity: self.base.name.clone(),
                field: field.name,
            });
        }
        self.added_fields.push(field);
        Ok(())
    }

    pub fn add_relationship(&mut self, relationship: EntityRelationship) {
        self.added_relationships.push(relationship);
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// The entity as the session currently shows it: pending removals carry
    /// `isRemoved`, pending additions carry no marker yet
    pub fn preview(&self) -> Entity {
        let mut entity = self.base.clone();
        for (i, field) in entity.fields.iter_mut().enumerate() {
            field.is_removed = self.removed_fields.contains(&i);
        }
        for (i, rel) in entity.relationships.iter_mut().enumerate() {
            rel.is_removed = self.removed_relationships.contains(&i);
        }
        entity.fields.extend(self.added_fields.iter().cloned());
        entity
            .relationships
            .extend(self.added_relationships.iter().cloned());
        entity.metadata.description = self.description.clone();
        entity
    }

    /// Drops every pending change, returning the entity as it was when the
    /// session began
    pub fn discard(self) -> Entity {
        self.base
    }

    /// Applies every pending change to the project at once. On error the
    /// project is left untouched.
    pub fn commit(self, project: &mut Project) -> Result<(), ModelError> {
        if !project.has_entity(&self.base.name) {
            return Err(ModelError::EntityNotFound(self.base.name));
        }
        if let Some(rel) = self
            .added_relationships
            .iter()
            .find(|r| r.entity != self.base.name && !project.has_entity(&r.entity))
        {
            return Err(ModelError::EntityNotFound(rel.entity.clone()));
        }

        let mut fields: Vec<EntityField> = self.kept_fields().cloned().collect();
        fields.extend(self.added_fields.iter().cloned());
        let mut names = HashSet::new();
        if let Some(dup) = fields.iter().find(|f| !names.insert(f.name.as_str())) {
            return Err(ModelError::DuplicateField {
                entity: self.base.name.clone(),
                field: dup.name.clone(),
            });
        }

        let mut relationships: Vec<EntityRelationship> = self
            .base
            .relationships
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.removed_relationships.contains(i))
            .map(|(_, r)| r.clone())
            .collect();
        relationships.extend(self.added_relationships.iter().cloned());

        // Checked above
        if let Some(entity) = project.entity_mut(&self.base.name) {
            entity.fields = fields;
            entity.relationships = relationships;
            entity.metadata.description = self.description;
        }
        project.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldType, RelationshipType};

    fn project() -> Project {
        let mut project = Project::new("School", "", "alice");
        project.entities = vec![
            Entity::new("Student")
                .with_field(EntityField::new("name", FieldType::Text))
                .with_field(EntityField::new("email", FieldType::Email))
                .with_relationship(RelationshipType::ManyToMany, "Course"),
            Entity::new("Course"),
        ];
        project
    }

    #[test]
    fn test_commit_applies_removals_and_additions() {
        let mut project = project();
        let mut session = EditSession::begin(&project, "Student").unwrap();
        assert!(!session.is_dirty());

        session.mark_field_removed(1).unwrap();
        session.mark_relationship_removed(0).unwrap();
        session
            .add_field(EntityField::new("enrolled", FieldType::Date))
            .unwrap();
        session.add_relationship(EntityRelationship::new(RelationshipType::OneToOne, "Course"));
        session.set_description(Some("A learner".to_string()));
        assert!(session.is_dirty());

        session.commit(&mut project).unwrap();
        let student = project.entity("Student").unwrap();
        let names: Vec<&str> = student.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["name", "enrolled"]);
        assert_eq!(student.relationships.len(), 1);
        assert_eq!(student.relationships[0].rel_type, RelationshipType::OneToOne);
        assert_eq!(student.metadata.description.as_deref(), Some("A learner"));
    }

    #[test]
    fn test_discard_leaves_project_alone() {
        let project = project();
        let mut session = EditSession::begin(&project, "Student").unwrap();
        session.mark_field_removed(0).unwrap();
        session.set_description(Some("Learners".to_string()));
        assert!(session.is_dirty());

        let original = session.discard();
        assert_eq!(&original, project.entity("Student").unwrap());
        assert_eq!(project.entity("Student").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_cancel_removal() {
        let mut project = project();
        let mut session = EditSession::begin(&project, "Student").unwrap();
        session.mark_field_removed(0).unwrap();
        assert!(session.preview().fields[0].is_removed);
        assert!(session.cancel_field_removal(0));
        assert!(!session.cancel_field_removal(0));
        assert!(!session.is_dirty());

        session.commit(&mut project).unwrap();
        assert_eq!(project.entity("Student").unwrap().fields.len(), 2);
    }

    #[test]
    fn test_readding_removed_field_name() {
        let mut project = project();
        let mut session = EditSession::begin(&project, "Student").unwrap();
        assert!(session
            .add_field(EntityField::new("email", FieldType::Text))
            .is_err());

        session.mark_field_removed(1).unwrap();
        session
            .add_field(EntityField::new("email", FieldType::Text))
            .unwrap();
        // Un-marking now collides with the re-added field
        session.cancel_field_removal(1);
        let err = session.commit(&mut project).unwrap_err();
        assert!(matches!(err, ModelError::DuplicateField { .. }));
        assert_eq!(
            project.entity("Student").unwrap().fields[1].field_type,
            FieldType::Email
        );
    }

    #[test]
    fn test_commit_rejects_unknown_relationship_target() {
        let mut project = project();
        let mut session = EditSession::begin(&project, "Student").unwrap();
        session.add_relationship(EntityRelationship::new(RelationshipType::OneToOne, "Locker"));
        assert_eq!(
            session.commit(&mut project),
            Err(ModelError::EntityNotFound("Locker".to_string()))
        );
    }

    #[test]
    fn test_out_of_range_indexes() {
        let project = project();
        let mut session = EditSession::begin(&project, "Course").unwrap();
        assert_eq!(
            session.mark_field_removed(0),
            Err(ModelError::FieldIndexOutOfRange(0))
        );
        assert_eq!(
            session.mark_relationship_removed(3),
            Err(ModelError::RelationshipIndexOutOfRange(3))
        );
        assert!(EditSession::begin(&project, "Teacher").is_err());
    }
}
