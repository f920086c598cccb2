//! Prompt Templates for AI Operations
//!
//! Builds the prompts that ask the model for a structured application
//! model. Both prompts request the same JSON shape, which is parsed into
//! a `RawProject` and then normalized.

use crate::models::{FieldType, Project};

/// The JSON shape every prompt asks for
const MODEL_SCHEMA: &str = r#"```json
{
  "appName": "<short application name>",
  "description": "<one paragraph summary>",
  "entities": [
    {
      "name": "<singular PascalCase noun>",
      "fields": [
        {
          "name": "<camelCase field name>",
          "type": "<text|email|number|date|boolean|select|textarea>",
          "required": <true|false>,
          "validation": { "min": <number>, "max": <number>, "options": ["<option>"] }
        }
      ],
      "relationships": [
        {
          "type": "<one-to-one|one-to-many|many-to-one|many-to-many>",
          "entity": "<name of another entity>",
          "description": "<what the relationship means>"
        }
      ],
      "metadata": { "description": "<what this entity represents>" }
    }
  ],
  "roles": [
    { "name": "<role name>", "description": "<who this is>" }
  ],
  "features": [
    {
      "id": "<kebab-case-id>",
      "name": "<feature name>",
      "description": "<what the feature does>",
      "category": "<entity|relationship>",
      "entityTarget": "<entity name, for entity features>",
      "relatedEntities": ["<entity A>", "<entity B>"],
      "showInEntityLists": ["<entity A>"],
      "permissions": [
        { "role": "<role name>", "actions": ["<read|full>"] }
      ]
    }
  ],
  "junctionSuggestions": [
    { "name": "<entity name>", "between": ["<entity A>", "<entity B>"], "reason": "<why>" }
  ]
}
```"#;

const MODEL_RULES: &str = r#"## Rules
- Every relationship "entity" and every feature "entityTarget"/"relatedEntities" value must be the name of an entity you listed.
- Relationship features list exactly two related entities; "showInEntityLists" only contains names from "relatedEntities".
- Each feature has at most one permission entry per role. "full" means create/edit/delete and implies read.
- Give every entity at least one field; do not include "id", "createdAt" or "updatedAt" fields.
- Suggest a junction entity only for many-to-many relationships that carry their own data."#;

fn field_types() -> String {
    FieldType::all()
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Summarizes an existing project for refinement prompts
fn build_project_context(project: &Project) -> String {
    let mut context = format!(
        "## Current Model\n- Application: {}\n- Description: {}\n",
        project.app_name,
        if project.description.is_empty() {
            "(none)"
        } else {
            &project.description
        }
    );

    context.push_str("\n### Entities\n");
    for entity in &project.entities {
        let fields: Vec<String> = entity
            .fields
            .iter()
            .map(|f| format!("{}: {}{}", f.name, f.field_type, if f.required { "*" } else { "" }))
            .collect();
        context.push_str(&format!("- {} ({})\n", entity.name, fields.join(", ")));
        for rel in &entity.relationships {
            context.push_str(&format!("  - {} {}\n", rel.rel_type, rel.entity));
        }
    }

    context.push_str("\n### Roles\n");
    for role in &project.roles {
        context.push_str(&format!("- {}: {}\n", role.name, role.description));
    }

    context.push_str("\n### Features\n");
    for feature in &project.features {
        let access: Vec<String> = feature
            .permissions
            .iter()
            .map(|p| format!("{}={}", p.role, p.level()))
            .collect();
        context.push_str(&format!(
            "- {} [{}] {} ({})\n",
            feature.id,
            feature.category,
            feature.name,
            if access.is_empty() {
                "no access".to_string()
            } else {
                access.join(", ")
            }
        ));
    }

    context
}

/// Build prompt for extracting a model from a plain-language description
pub fn build_extraction_prompt(description: &str) -> String {
    format!(
        r#"You are an expert software architect turning an application idea into a data model for a clickable prototype.

## Application Description
{description}

## Task
Identify the entities (with typed fields and relationships), the user roles, and the features of this application.
Features either manage one entity (category "entity") or connect two entities (category "relationship").
Assign each role "read" or "full" access to the features it needs; leave a role out of a feature's permissions when it has no access.
Allowed field types: {types}.

{rules}

## Response Format
Respond ONLY with valid JSON in this exact format:
{schema}"#,
        description = description.trim(),
        types = field_types(),
        rules = MODEL_RULES,
        schema = MODEL_SCHEMA,
    )
}

/// Build prompt for revising an existing model according to a user request
pub fn build_refine_prompt(project: &Project, instruction: &str) -> String {
    format!(
        r#"You are an expert software architect revising the data model of a clickable prototype.

{context}
## Requested Change
{instruction}

## Task
Return the complete revised model, keeping every entity, role, feature and permission the request does not affect exactly as it is, including feature ids.

{rules}

## Response Format
Respond ONLY with valid JSON in this exact format:
{schema}"#,
        context = build_project_context(project),
        instruction = instruction.trim(),
        rules = MODEL_RULES,
        schema = MODEL_SCHEMA,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, EntityField, Feature, PermissionLevel, RelationshipType, Role};

    #[test]
    fn test_extraction_prompt_contains_description_and_schema() {
        let prompt = build_extraction_prompt("  A library app for lending books  ");
        assert!(prompt.contains("A library app for lending books\n"));
        assert!(prompt.contains("\"relatedEntities\""));
        assert!(prompt.contains("text, email, number, date, boolean, select, textarea"));
    }

    #[test]
    fn test_refine_prompt_includes_current_model() {
        let mut project = Project::new("Library", "", "alice");
        project.entities.push(
            Entity::new("Book")
                .with_field(EntityField::new("title", FieldType::Text).required())
                .with_relationship(RelationshipType::ManyToOne, "Author"),
        );
        project.roles.push(Role::new("Librarian", "Staff"));
        project.features.push(
            Feature::entity("manage-books", "Manage Books", "Book")
                .with_permission("Librarian", PermissionLevel::Full),
        );

        let prompt = build_refine_prompt(&project, "Add members");
        assert!(prompt.contains("- Book (title: text*)"));
        assert!(prompt.contains("  - many-to-one Author"));
        assert!(prompt.contains("manage-books [entity] Manage Books (Librarian=full)"));
        assert!(prompt.contains("## Requested Change\nAdd members"));
    }
}
