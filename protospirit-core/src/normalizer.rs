//! Model Normalizer
//!
//! Coerces loosely-typed input (AI output, imported files, older saves)
//! into the canonical `Project` shape. Nothing here rejects input: missing
//! collections become empty, unknown enum strings fall back to defaults,
//! legacy string features become structured features, and the final
//! `Project::repair` pass drops whatever still dangles.

use log::{debug, warn};
use std::collections::HashSet;

use crate::input::{FeatureInput, RawEntity, RawFeature, RawField, RawProject, RawRelationship, RawRole};
use crate::models::{
    Action, Entity, EntityField, EntityRelationship, Feature, FeatureCategory, FeaturePermission,
    FieldType, PermissionLevel, Project, RelationshipType, Role,
};
use crate::rules::{slugify, unique_feature_id};

/// Tokens that mark a legacy feature name as a relationship feature
const RELATIONSHIP_TOKENS: [&str; 3] = ["assign", "link", "connect"];

fn prepare_field(raw: RawField) -> EntityField {
    let name = raw.name.unwrap_or_default().trim().to_string();
    let field_type = match raw.field_type.as_deref() {
        None => FieldType::Text,
        Some(s) => FieldType::parse(s).unwrap_or_else(|| {
            warn!("Unknown field type '{}' on field '{}', using text", s, name);
            FieldType::Text
        }),
    };

    EntityField {
        name,
        field_type,
        required: raw.required.unwrap_or(false),
        validation: raw.validation,
        metadata: raw.metadata,
        is_removed: false,
    }
}

fn prepare_relationship(raw: RawRelationship) -> EntityRelationship {
    let entity = raw.entity.unwrap_or_default().trim().to_string();
    let rel_type = match raw.rel_type.as_deref() {
        None => RelationshipType::default(),
        Some(s) => RelationshipType::parse(s).unwrap_or_else(|| {
            warn!("Unknown relationship type '{}' to '{}', using one-to-many", s, entity);
            RelationshipType::default()
        }),
    };

    EntityRelationship {
        rel_type,
        entity,
        description: raw.description,
        foreign_key: raw.foreign_key,
        is_removed: false,
    }
}

/// Fills in every optional entity collection. A missing name becomes the
/// empty string; catching that is left to the persistence layer.
pub fn prepare_entities(raw: Vec<RawEntity>) -> Vec<Entity> {
    raw.into_iter()
        .map(|e| Entity {
            name: e.name.unwrap_or_default().trim().to_string(),
            fields: e
                .fields
                .unwrap_or_default()
                .into_iter()
                .map(prepare_field)
                .collect(),
            relationships: e
                .relationships
                .unwrap_or_default()
                .into_iter()
                .map(prepare_relationship)
                .collect(),
            examples: e.examples.unwrap_or_default(),
            metadata: e.metadata.unwrap_or_default(),
        })
        .collect()
}

/// Roles keep their legacy grant lists until `normalize` absorbs them
pub fn prepare_roles(raw: Vec<RawRole>) -> Vec<Role> {
    raw.into_iter()
        .map(|r| Role {
            name: r.name.unwrap_or_default().trim().to_string(),
            description: r.description.unwrap_or_default(),
            features: r.features.unwrap_or_default(),
        })
        .collect()
}

/// Infers a legacy feature's category from its name
pub fn guess_category(feature_name: &str, entities: &[Entity]) -> FeatureCategory {
    let lower = feature_name.to_lowercase();

    let mentions_entity = entities
        .iter()
        .filter(|e| !e.name.is_empty())
        .any(|e| lower.contains(&e.name.to_lowercase()));
    if mentions_entity {
        return FeatureCategory::Entity;
    }

    if RELATIONSHIP_TOKENS.iter().any(|t| lower.contains(t)) {
        FeatureCategory::Relationship
    } else {
        FeatureCategory::Entity
    }
}

/// Permissions given to a converted legacy feature: admins get full
/// access, every other role read access
pub fn default_permissions(roles: &[Role]) -> Vec<FeaturePermission> {
    roles
        .iter()
        .map(|r| {
            let level = if r.is_admin() {
                PermissionLevel::Full
            } else {
                PermissionLevel::Read
            };
            FeaturePermission::new(r.name.clone(), level)
        })
        .collect()
}

fn convert_structured(raw: RawFeature, entities: &[Entity]) -> Feature {
    let name = raw.name.unwrap_or_default().trim().to_string();
    let related_entities = raw.related_entities.unwrap_or_default();

    let category = match raw.category.as_deref().and_then(FeatureCategory::parse) {
        Some(category) => category,
        None if related_entities.len() == 2 => FeatureCategory::Relationship,
        None if raw.entity_target.is_some() => FeatureCategory::Entity,
        None => guess_category(&name, entities),
    };

    let permissions = raw
        .permissions
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| {
            let role = p.role?;
            let actions: Vec<Action> = p
                .actions
                .iter()
                .filter_map(|a| {
                    let action = Action::parse(a);
                    if action.is_none() {
                        warn!("Dropping unknown action '{}' for role '{}' on '{}'", a, role, name);
                    }
                    action
                })
                .collect();
            Some(FeaturePermission { role, actions })
        })
        .collect();

    Feature {
        id: raw.id.unwrap_or_default().trim().to_string(),
        name,
        description: raw.description.unwrap_or_default(),
        category,
        entity_target: raw.entity_target,
        relationship_target: raw.relationship_target,
        related_entities,
        show_in_entity_lists: raw.show_in_entity_lists.unwrap_or_default(),
        permissions,
    }
}

/// Produces structured features from a possibly-legacy feature list.
///
/// A legacy entry (a bare name) becomes `feature_<1-based index>` with an
/// inferred category and default permissions for every role. Structured
/// entries are carried over as they are.
pub fn convert_features(
    features: Vec<FeatureInput>,
    entities: &[Entity],
    roles: &[Role],
) -> Vec<Feature> {
    features
        .into_iter()
        .enumerate()
        .map(|(index, input)| match input {
            FeatureInput::Legacy(name) => {
                let name = name.trim().to_string();
                Feature {
                    id: format!("feature_{}", index + 1),
                    category: guess_category(&name, entities),
                    permissions: default_permissions(roles),
                    name,
                    ..Default::default()
                }
            }
            FeatureInput::Structured(raw) => convert_structured(raw, entities),
        })
        .collect()
}

/// Grants full access for every legacy `role.features` entry that the
/// matching feature does not already cover. Entries are matched by feature
/// name first, then by id. A list equal to the derived one carries nothing
/// new and is left alone.
fn absorb_legacy_grants(project: &mut Project) {
    let derived: Vec<Vec<String>> = project
        .roles
        .iter()
        .map(|r| project.role_features(&r.name))
        .collect();

    for (role, derived) in project.roles.iter().zip(derived) {
        if role.features == derived {
            continue;
        }
        for grant in &role.features {
            let Some(idx) = project
                .features
                .iter()
                .position(|f| f.name == *grant)
                .or_else(|| project.features.iter().position(|f| f.id == *grant))
            else {
                continue;
            };
            let feature = &mut project.features[idx];
            if feature.permission_for(&role.name).is_none() {
                debug!("Granting '{}' full access to '{}' from legacy list", role.name, feature.id);
                feature
                    .permissions
                    .push(FeaturePermission::new(role.name.clone(), PermissionLevel::Full));
            }
        }
    }
}

/// Brings a project into canonical form. A canonical project is left
/// unchanged.
pub fn normalize(project: &mut Project) {
    let mut seen = HashSet::new();
    project.entities.retain(|e| {
        let first = seen.insert(e.name.clone());
        if !first {
            warn!("Dropping duplicate entity '{}'", e.name);
        }
        first
    });

    let mut seen = HashSet::new();
    project.roles.retain(|r| {
        let first = seen.insert(r.name.clone());
        if !first {
            warn!("Dropping duplicate role '{}'", r.name);
        }
        first
    });

    let mut seen = HashSet::new();
    project.features.retain(|f| {
        let first = seen.insert(f.name.to_lowercase());
        if !first {
            warn!("Dropping duplicate feature '{}'", f.name);
        }
        first
    });

    let mut assigned: Vec<Feature> = Vec::with_capacity(project.features.len());
    for mut feature in std::mem::take(&mut project.features) {
        if feature.id.is_empty() || assigned.iter().any(|f| f.id == feature.id) {
            let base = if feature.id.is_empty() {
                slugify(&feature.name)
            } else {
                feature.id.clone()
            };
            feature.id = unique_feature_id(&assigned, &base);
        }
        assigned.push(feature);
    }
    project.features = assigned;

    absorb_legacy_grants(project);
    let repairs = project.repair();
    if repairs > 0 {
        debug!("Repaired {} references in '{}'", repairs, project.app_name);
    }
}

/// Builds a canonical project from raw input
pub fn normalize_project(raw: RawProject, created_by: &str) -> Project {
    let entities = prepare_entities(raw.entities);
    let roles = prepare_roles(raw.roles);
    let features = convert_features(raw.features, &entities, &roles);

    let mut project = Project::new(
        raw.app_name.unwrap_or_default().trim(),
        raw.description.unwrap_or_default(),
        created_by,
    );
    project.entities = entities;
    project.roles = roles;
    project.features = features;

    normalize(&mut project);
    project
}
