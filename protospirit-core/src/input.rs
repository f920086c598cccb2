//! Loosely-typed project data as produced by the AI or imported from files.
//!
//! Every collection is optional and enum-like values are kept as strings;
//! `normalizer` turns these into the canonical model types.

use serde::{Deserialize, Serialize};

use crate::models::{
    EntityMetadata, ExampleRecord, FieldMetadata, FieldValidation, JunctionSuggestion,
};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawField {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: Option<String>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub validation: Option<FieldValidation>,
    #[serde(default)]
    pub metadata: Option<FieldMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawRelationship {
    #[serde(rename = "type", default)]
    pub rel_type: Option<String>,
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawEntity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub fields: Option<Vec<RawField>>,
    #[serde(default)]
    pub relationships: Option<Vec<RawRelationship>>,
    #[serde(default)]
    pub examples: Option<Vec<ExampleRecord>>,
    #[serde(default)]
    pub metadata: Option<EntityMetadata>,
}

impl RawEntity {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawRole {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Legacy grant list: feature names or IDs
    #[serde(default)]
    pub features: Option<Vec<String>>,
}

impl RawRole {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RawPermission {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawFeature {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub entity_target: Option<String>,
    #[serde(default)]
    pub relationship_target: Option<String>,
    #[serde(default)]
    pub related_entities: Option<Vec<String>>,
    #[serde(default)]
    pub show_in_entity_lists: Option<Vec<String>>,
    #[serde(default)]
    pub permissions: Option<Vec<RawPermission>>,
}

/// A feature as found in input: a bare name (legacy) or a record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureInput {
    Legacy(String),
    Structured(RawFeature),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawProject {
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub entities: Vec<RawEntity>,
    #[serde(default)]
    pub roles: Vec<RawRole>,
    #[serde(default)]
    pub features: Vec<FeatureInput>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub junction_suggestions: Vec<JunctionSuggestion>,
}
