use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A sample record for an entity, keyed by field name
pub type ExampleRecord = serde_json::Map<String, serde_json::Value>;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Strips separators and lowercases, so "one_to_many", "oneToMany" and
/// "One-To-Many" all compare equal
fn squash(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The input type of an entity field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Email,
    Number,
    Date,
    Boolean,
    Select,
    Textarea,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Email => write!(f, "email"),
            FieldType::Number => write!(f, "number"),
            FieldType::Date => write!(f, "date"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Select => write!(f, "select"),
            FieldType::Textarea => write!(f, "textarea"),
        }
    }
}

impl FieldType {
    /// Parse a field type leniently, accepting the common aliases AI output uses
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "text" | "string" | "str" | "varchar" => Some(FieldType::Text),
            "email" => Some(FieldType::Email),
            "number" | "int" | "integer" | "float" | "decimal" | "numeric" => {
                Some(FieldType::Number)
            }
            "date" | "datetime" | "timestamp" => Some(FieldType::Date),
            "boolean" | "bool" | "checkbox" => Some(FieldType::Boolean),
            "select" | "enum" | "dropdown" => Some(FieldType::Select),
            "textarea" | "longtext" | "richtext" => Some(FieldType::Textarea),
            _ => None,
        }
    }

    pub fn all() -> [FieldType; 7] {
        [
            FieldType::Text,
            FieldType::Email,
            FieldType::Number,
            FieldType::Date,
            FieldType::Boolean,
            FieldType::Select,
            FieldType::Textarea,
        ]
    }
}

/// Validation constraints attached to a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

/// Presentation hints for a field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_text: Option<String>,
}

/// A single field of an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityField {
    pub name: String,

    #[serde(rename = "type", default)]
    pub field_type: FieldType,

    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<FieldValidation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FieldMetadata>,

    /// Marked for removal; purged on save
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_removed: bool,
}

impl EntityField {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            ..Default::default()
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Select options, if any were configured
    pub fn options(&self) -> &[String] {
        self.validation
            .as_ref()
            .and_then(|v| v.options.as_deref())
            .unwrap_or(&[])
    }
}

/// Cardinality of a relationship between two entities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RelationshipType {
    #[serde(rename = "one-to-one")]
    OneToOne,
    #[default]
    #[serde(rename = "one-to-many")]
    OneToMany,
    #[serde(rename = "many-to-one")]
    ManyToOne,
    #[serde(rename = "many-to-many")]
    ManyToMany,
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipType::OneToOne => write!(f, "one-to-one"),
            RelationshipType::OneToMany => write!(f, "one-to-many"),
            RelationshipType::ManyToOne => write!(f, "many-to-one"),
            RelationshipType::ManyToMany => write!(f, "many-to-many"),
        }
    }
}

impl RelationshipType {
    /// Parse a relationship type, ignoring case and separators
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "onetoone" | "11" => Some(RelationshipType::OneToOne),
            "onetomany" | "1n" | "hasmany" => Some(RelationshipType::OneToMany),
            "manytoone" | "n1" | "belongsto" => Some(RelationshipType::ManyToOne),
            "manytomany" | "nm" | "nn" => Some(RelationshipType::ManyToMany),
            _ => None,
        }
    }

    /// The same relationship seen from the target entity
    pub fn inverse(&self) -> Self {
        match self {
            RelationshipType::OneToOne => RelationshipType::OneToOne,
            RelationshipType::OneToMany => RelationshipType::ManyToOne,
            RelationshipType::ManyToOne => RelationshipType::OneToMany,
            RelationshipType::ManyToMany => RelationshipType::ManyToMany,
        }
    }
}

/// A directed association from one entity to another
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityRelationship {
    #[serde(rename = "type", default)]
    pub rel_type: RelationshipType,

    /// Name of the target entity
    pub entity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreign_key: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_removed: bool,
}

impl EntityRelationship {
    pub fn new(rel_type: RelationshipType, entity: impl Into<String>) -> Self {
        Self {
            rel_type,
            entity: entity.into(),
            ..Default::default()
        }
    }
}

/// Descriptive and edit-session state for an entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_new: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_removed: bool,
}

/// A first-class noun of the modelled application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub name: String,

    #[serde(default)]
    pub fields: Vec<EntityField>,

    #[serde(default)]
    pub relationships: Vec<EntityRelationship>,

    /// Generated sample records; disposable
    #[serde(default)]
    pub examples: Vec<ExampleRecord>,

    #[serde(default)]
    pub metadata: EntityMetadata,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, field: EntityField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_relationship(mut self, rel_type: RelationshipType, target: &str) -> Self {
        self.relationships
            .push(EntityRelationship::new(rel_type, target));
        self
    }

    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if this entity declares a relationship to `target`
    pub fn relates_to(&self, target: &str) -> bool {
        self.relationships.iter().any(|r| r.entity == target)
    }
}

/// A class of end user of the modelled application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Names of the features this role can access.
    /// Regenerated from `Feature::permissions`; never edited directly.
    #[serde(default)]
    pub features: Vec<String>,
}

impl Role {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            features: Vec::new(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.name.to_lowercase().contains("admin")
    }
}

/// A stored permission action
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Full,
}

impl Action {
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "read" => Some(Action::Read),
            "full" => Some(Action::Full),
            _ => None,
        }
    }
}

/// Access a role has to a feature
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    None,
    Read,
    Full,
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::None => write!(f, "none"),
            PermissionLevel::Read => write!(f, "read"),
            PermissionLevel::Full => write!(f, "full"),
        }
    }
}

impl PermissionLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "none" | "" => Some(PermissionLevel::None),
            "read" => Some(PermissionLevel::Read),
            "full" => Some(PermissionLevel::Full),
            _ => None,
        }
    }

    /// Next level in the toggle cycle none -> read -> full -> none
    pub fn next(self) -> Self {
        match self {
            PermissionLevel::None => PermissionLevel::Read,
            PermissionLevel::Read => PermissionLevel::Full,
            PermissionLevel::Full => PermissionLevel::None,
        }
    }

    /// Effective level of a stored action list; `full` wins over `read`
    pub fn from_actions(actions: &[Action]) -> Self {
        if actions.contains(&Action::Full) {
            PermissionLevel::Full
        } else if actions.contains(&Action::Read) {
            PermissionLevel::Read
        } else {
            PermissionLevel::None
        }
    }

    pub fn action(self) -> Option<Action> {
        match self {
            PermissionLevel::None => None,
            PermissionLevel::Read => Some(Action::Read),
            PermissionLevel::Full => Some(Action::Full),
        }
    }
}

/// One role's access to a feature
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeaturePermission {
    pub role: String,
    pub actions: Vec<Action>,
}

impl FeaturePermission {
    pub fn new(role: impl Into<String>, level: PermissionLevel) -> Self {
        Self {
            role: role.into(),
            actions: level.action().into_iter().collect(),
        }
    }

    pub fn level(&self) -> PermissionLevel {
        PermissionLevel::from_actions(&self.actions)
    }
}

/// Whether a feature manages one entity or links two
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum FeatureCategory {
    #[default]
    Entity,
    Relationship,
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureCategory::Entity => write!(f, "entity"),
            FeatureCategory::Relationship => write!(f, "relationship"),
        }
    }
}

impl FeatureCategory {
    pub fn parse(s: &str) -> Option<Self> {
        match squash(s).as_str() {
            "entity" | "crud" => Some(FeatureCategory::Entity),
            "relationship" | "relation" | "link" => Some(FeatureCategory::Relationship),
            _ => None,
        }
    }
}

/// A capability of the modelled application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub category: FeatureCategory,

    /// Entity managed by an entity feature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_target: Option<String>,

    /// The two entities connected by a relationship feature
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_entities: Vec<String>,

    /// Which of the related entities surface this feature in their lists
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub show_in_entity_lists: Vec<String>,

    #[serde(default)]
    pub permissions: Vec<FeaturePermission>,
}

impl Feature {
    /// An entity feature managing `target`
    pub fn entity(id: impl Into<String>, name: impl Into<String>, target: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: FeatureCategory::Entity,
            entity_target: Some(target.to_string()),
            ..Default::default()
        }
    }

    /// A relationship feature linking `a` and `b`
    pub fn relationship(id: impl Into<String>, name: impl Into<String>, a: &str, b: &str) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category: FeatureCategory::Relationship,
            related_entities: vec![a.to_string(), b.to_string()],
            ..Default::default()
        }
    }

    pub fn with_permission(mut self, role: &str, level: PermissionLevel) -> Self {
        self.permissions.retain(|p| p.role != role);
        if level != PermissionLevel::None {
            self.permissions.push(FeaturePermission::new(role, level));
        }
        self
    }

    pub fn permission_for(&self, role: &str) -> Option<&FeaturePermission> {
        self.permissions.iter().find(|p| p.role == role)
    }

    /// True when the feature names its entities explicitly rather than
    /// only through its display name
    pub fn has_structured_target(&self) -> bool {
        self.entity_target.is_some()
            || self.relationship_target.is_some()
            || !self.related_entities.is_empty()
    }

    /// Returns true if `id_or_name` identifies this feature
    pub fn matches(&self, id_or_name: &str) -> bool {
        self.id == id_or_name || self.name == id_or_name
    }
}

/// A suggested standalone entity materializing a many-to-many relationship
/// that carries its own data
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JunctionSuggestion {
    pub name: String,
    pub between: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

fn new_project_id() -> Uuid {
    Uuid::new_v4()
}

/// The aggregate root: a modelled application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default = "new_project_id")]
    pub id: Uuid,

    pub app_name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub entities: Vec<Entity>,

    #[serde(default)]
    pub roles: Vec<Role>,

    #[serde(default)]
    pub features: Vec<Feature>,

    /// Owning user; opaque to the model
    #[serde(default)]
    pub created_by: String,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub modified_at: DateTime<Utc>,
}

impl Project {
    pub fn new(
        app_name: impl Into<String>,
        description: impl Into<String>,
        created_by: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            app_name: app_name.into(),
            description: description.into(),
            entities: Vec::new(),
            roles: Vec::new(),
            features: Vec::new(),
            created_by: created_by.into(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn entity(&self, name: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.name == name)
    }

    pub fn entity_mut(&mut self, name: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.name == name)
    }

    pub fn has_entity(&self, name: &str) -> bool {
        self.entity(name).is_some()
    }

    pub fn role(&self, name: &str) -> Option<&Role> {
        self.roles.iter().find(|r| r.name == name)
    }

    pub fn has_role(&self, name: &str) -> bool {
        self.role(name).is_some()
    }

    /// Finds a feature by ID, falling back to its name
    pub fn feature(&self, id_or_name: &str) -> Option<&Feature> {
        self.feature_index(id_or_name).map(|i| &self.features[i])
    }

    pub fn feature_index(&self, id_or_name: &str) -> Option<usize> {
        self.features
            .iter()
            .position(|f| f.id == id_or_name)
            .or_else(|| self.features.iter().position(|f| f.name == id_or_name))
    }

    pub fn entity_names(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.name.clone()).collect()
    }

    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

/// All projects held by a storage backend
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProjectsStore {
    #[serde(default)]
    pub projects: Vec<Project>,
}

impl ProjectsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<&Project> {
        self.projects.iter().find(|p| &p.id == id)
    }

    /// Inserts the project, replacing any stored project with the same ID
    pub fn upsert(&mut self, project: Project) {
        match self.projects.iter_mut().find(|p| p.id == project.id) {
            Some(existing) => *existing = project,
            None => self.projects.push(project),
        }
    }

    pub fn remove(&mut self, id: &Uuid) -> Option<Project> {
        let pos = self.projects.iter().position(|p| &p.id == id)?;
        Some(self.projects.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_type_parse_aliases() {
        assert_eq!(FieldType::parse("String"), Some(FieldType::Text));
        assert_eq!(FieldType::parse("integer"), Some(FieldType::Number));
        assert_eq!(FieldType::parse("DateTime"), Some(FieldType::Date));
        assert_eq!(FieldType::parse("textarea"), Some(FieldType::Textarea));
        assert_eq!(FieldType::parse("blob"), None);
    }

    #[test]
    fn test_relationship_type_parse_and_serde() {
        assert_eq!(
            RelationshipType::parse("oneToMany"),
            Some(RelationshipType::OneToMany)
        );
        assert_eq!(
            RelationshipType::parse("many_to_many"),
            Some(RelationshipType::ManyToMany)
        );
        let json = serde_json::to_string(&RelationshipType::ManyToOne).unwrap();
        assert_eq!(json, "\"many-to-one\"");
        assert_eq!(RelationshipType::OneToMany.inverse(), RelationshipType::ManyToOne);
    }

    #[test]
    fn test_permission_level_cycle() {
        assert_eq!(PermissionLevel::None.next(), PermissionLevel::Read);
        assert_eq!(PermissionLevel::Read.next(), PermissionLevel::Full);
        assert_eq!(PermissionLevel::Full.next(), PermissionLevel::None);
    }

    #[test]
    fn test_full_supersedes_read() {
        let perm = FeaturePermission {
            role: "Admin".to_string(),
            actions: vec![Action::Read, Action::Full],
        };
        assert_eq!(perm.level(), PermissionLevel::Full);
        assert_eq!(PermissionLevel::from_actions(&[]), PermissionLevel::None);
    }

    #[test]
    fn test_feature_serializes_camel_case() {
        let feature = Feature::relationship("enroll", "Enroll", "Student", "Course")
            .with_permission("Admin", PermissionLevel::Full);
        let json = serde_json::to_value(&feature).unwrap();
        assert_eq!(json["relatedEntities"][1], "Course");
        assert_eq!(json["category"], "relationship");
        assert_eq!(json["permissions"][0]["actions"][0], "full");
        assert!(json.get("entityTarget").is_none());
    }

    #[test]
    fn test_feature_lookup_prefers_id() {
        let mut project = Project::new("App", "", "alice");
        project.features.push(Feature::entity("orders", "Manage Orders", "Order"));
        project.features.push(Feature::entity("Manage Orders", "Other", "Order"));
        assert_eq!(project.feature("Manage Orders").unwrap().name, "Other");
        assert_eq!(project.feature("orders").unwrap().name, "Manage Orders");
    }

    #[test]
    fn test_store_upsert_replaces() {
        let mut store = ProjectsStore::new();
        let mut project = Project::new("App", "", "alice");
        store.upsert(project.clone());
        project.app_name = "Renamed".to_string();
        store.upsert(project.clone());
        assert_eq!(store.projects.len(), 1);
        assert_eq!(store.get(&project.id).unwrap().app_name, "Renamed");
    }
}
