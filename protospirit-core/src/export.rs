use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

use crate::graph::relationship_edges;
use crate::matrix::PermissionMatrix;
use crate::models::{FeatureCategory, PermissionLevel, Project};

/// Output formats supported by `export`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Markdown,
}

impl ExportFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
        }
    }
}

/// The project in its camelCase interchange form
pub fn render_json(project: &Project) -> Result<String> {
    serde_json::to_string_pretty(project).context("Failed to serialize project to JSON")
}

fn level_cell(level: PermissionLevel) -> &'static str {
    match level {
        PermissionLevel::None => "-",
        PermissionLevel::Read => "read",
        PermissionLevel::Full => "full",
    }
}

/// Markdown overview: entities, relationships, features and the permission matrix
pub fn render_markdown(project: &Project) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", project.app_name));
    if !project.description.is_empty() {
        output.push_str(&format!("{}\n\n", project.description));
    }

    output.push_str("## Entities\n\n");
    for entity in project.entities.iter().filter(|e| !e.metadata.is_removed) {
        output.push_str(&format!("### {}\n\n", entity.name));
        if let Some(description) = &entity.metadata.description {
            output.push_str(&format!("{}\n\n", description));
        }
        output.push_str("| Field | Type | Required |\n|---|---|---|\n");
        for field in entity.fields.iter().filter(|f| !f.is_removed) {
            let field_type = match field.options() {
                [] => field.field_type.to_string(),
                options => format!("{} ({})", field.field_type, options.join(", ")),
            };
            output.push_str(&format!(
                "| {} | {} | {} |\n",
                field.name,
                field_type,
                if field.required { "yes" } else { "no" }
            ));
        }
        output.push('\n');
    }

    let edges = relationship_edges(&project.entities);
    if !edges.is_empty() {
        output.push_str("## Relationships\n\n");
        for edge in &edges {
            output.push_str(&format!("- {} {} {}", edge.source, edge.rel_type, edge.target));
            if let Some(description) = &edge.description {
                output.push_str(&format!(": {}", description));
            }
            output.push('\n');
        }
        output.push('\n');
    }

    output.push_str("## Features\n\n");
    for feature in &project.features {
        let scope = match feature.category {
            FeatureCategory::Entity => feature.entity_target.clone().unwrap_or_default(),
            FeatureCategory::Relationship => feature.related_entities.join(" <-> "),
        };
        output.push_str(&format!("- **{}** `{}` ({}", feature.name, feature.id, feature.category));
        if !scope.is_empty() {
            output.push_str(&format!(": {}", scope));
        }
        output.push(')');
        if !feature.description.is_empty() {
            output.push_str(&format!(" {}", feature.description));
        }
        output.push('\n');
    }
    output.push('\n');

    let matrix = PermissionMatrix::from_project(project);
    if !matrix.roles.is_empty() && !matrix.features.is_empty() {
        output.push_str("## Permissions\n\n| Role |");
        for column in &matrix.features {
            output.push_str(&format!(" {} |", column.name));
        }
        output.push_str("\n|---|");
        output.push_str(&"---|".repeat(matrix.features.len()));
        output.push('\n');
        for (role, levels) in matrix.rows() {
            output.push_str(&format!("| {} |", role));
            for level in levels {
                output.push_str(&format!(" {} |", level_cell(*level)));
            }
            output.push('\n');
        }
    }

    output
}

/// Writes the project to `output_path` in the given format
pub fn export_project(project: &Project, format: ExportFormat, output_path: &Path) -> Result<()> {
    let content = match format {
        ExportFormat::Json => render_json(project)?,
        ExportFormat::Markdown => render_markdown(project),
    };
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write export to {:?}", output_path))?;

    info!(
        "Exported '{}' as {} to {}",
        project.app_name,
        format.extension(),
        output_path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::demo_project;
    use tempfile::TempDir;

    #[test]
    fn test_markdown_sections() {
        let project = demo_project("alice").unwrap();
        let md = render_markdown(&project);

        assert!(md.starts_with("# Course Enrollment\n"));
        assert!(md.contains("### Course\n"));
        assert!(md.contains("| term | select (Fall, Spring, Summer) | no |"));
        assert!(md.contains("- **Enroll Students** `enroll-students` (relationship: Student <-> Course)"));
        assert!(md.contains("| Student | - | read | - | read |"));
    }

    #[test]
    fn test_markdown_lists_each_pair_once() {
        let project = demo_project("alice").unwrap();
        let md = render_markdown(&project);

        let many_to_many = md.lines().filter(|l| l.contains("many-to-many")).count();
        assert_eq!(many_to_many, 1);
        assert!(md.contains("- Student many-to-many Course\n"));
        assert!(md.contains("- Course many-to-one Instructor\n"));
    }

    #[test]
    fn test_export_json_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("demo.json");
        let project = demo_project("alice").unwrap();

        export_project(&project, ExportFormat::Json, &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"appName\": \"Course Enrollment\""));
        let parsed: Project = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, project);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ExportFormat::parse("MD"), Some(ExportFormat::Markdown));
        assert_eq!(ExportFormat::parse("json"), Some(ExportFormat::Json));
        assert_eq!(ExportFormat::parse("pdf"), None);
    }
}
