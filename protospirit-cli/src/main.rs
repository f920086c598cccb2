mod cli;
mod prompts;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use log::debug;
use std::fs;
use std::path::Path;

use protospirit_core::db::{self, export_backend_to_json, import_json_to_backend};
use protospirit_core::export::{export_project, render_json, render_markdown};
use protospirit_core::graph::relationship_edges;
use protospirit_core::normalizer::guess_category;
use protospirit_core::samples::refresh_examples;
use protospirit_core::{
    classify_feature_for_entity, normalize_project, startup, App, AppConfig, BackendType,
    EditSession, Entity, EntityField, EntityRelationship, ExportFormat, Feature, FeatureCategory,
    FieldType, JunctionSuggestion, PermissionLevel, PermissionMatrix, Project, RawProject,
    RelationshipType, Role,
};

use crate::cli::{Cli, Command, DbCommand, EntityCommand, FeatureCommand, PermCommand, RoleCommand};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let mut config = AppConfig::load()?;
    config.apply_overrides(cli.db.clone(), cli.user.clone());
    let app = startup(&config)?;
    debug!("Acting as '{}' on {:?}", app.user(), app.backend.path());
    let project = cli.project.as_deref();

    match &cli.command {
        Command::Extract {
            description,
            name,
            dry_run,
        } => extract_project(&app, description.as_deref(), name.as_deref(), *dry_run)?,
        Command::Refine { instruction } => refine_project(&app, project, instruction)?,
        Command::Import { file } => import_project(&app, file)?,
        Command::List { mine } => list_projects(&app, *mine)?,
        Command::Show => show_project(&select_project(&app, project)?),
        Command::Delete { yes } => delete_project(&app, project, *yes)?,
        Command::Export { format, output } => {
            handle_export_command(&app, project, format, output.as_deref())?
        }
        Command::Matrix => print_matrix(&select_project(&app, project)?),
        Command::Perm(cmd) => handle_perm_command(cmd, &app, project)?,
        Command::Entity(cmd) => handle_entity_command(cmd, &app, project)?,
        Command::Role(cmd) => handle_role_command(cmd, &app, project)?,
        Command::Feature(cmd) => handle_feature_command(cmd, &app, project)?,
        Command::Samples { count } => {
            let count = count.unwrap_or(app.config.sample_count);
            let updated = modify_project(&app, project, |p| {
                refresh_examples(p, count);
                Ok(())
            })?;
            println!(
                "{}",
                format!(
                    "Generated {} sample record(s) for {} entities",
                    count,
                    updated.entities.len()
                )
                .green()
            );
        }
        Command::Db(cmd) => handle_db_command(cmd, &app)?,
    }

    Ok(())
}

// =============================================================================
// Project selection
// =============================================================================

/// Resolves `--project`, falling back to the only project or a prompt
fn select_project(app: &App, key: Option<&str>) -> Result<Project> {
    if let Some(key) = key {
        return app
            .backend
            .find_project(key)?
            .with_context(|| format!("Project not found: {}", key));
    }

    let projects = app.backend.list_projects(None)?;
    match projects.len() {
        0 => anyhow::bail!("No projects yet. Use 'protospirit extract' or 'protospirit import'."),
        1 => Ok(projects.into_iter().next().context("Project list changed")?),
        _ => {
            let id = prompts::prompt_select_project(&projects)?;
            projects
                .into_iter()
                .find(|p| p.id == id)
                .context("Selected project not found")
        }
    }
}

/// Applies `change` to the selected project as the current user and saves it
fn modify_project<F>(app: &App, key: Option<&str>, change: F) -> Result<Project>
where
    F: FnMut(&mut Project) -> Result<()>,
{
    let project = select_project(app, key)?;
    modify_selected(app, &project, change)
}

/// Applies `change` to an already selected project
fn modify_selected<F>(app: &App, project: &Project, mut change: F) -> Result<Project>
where
    F: FnMut(&mut Project) -> Result<()>,
{
    app.backend.update_project(&project.id, app.user(), &mut change)
}

// =============================================================================
// Project commands
// =============================================================================

fn print_suggestions(suggestions: &[JunctionSuggestion]) {
    if suggestions.is_empty() {
        return;
    }
    println!("\n{}", "Suggested junction entities:".yellow());
    for suggestion in suggestions {
        println!(
            "  {} between {}: {}",
            suggestion.name.bold(),
            suggestion.between.join(" and "),
            suggestion.reason
        );
    }
}

fn extract_project(
    app: &App,
    description: Option<&str>,
    name: Option<&str>,
    dry_run: bool,
) -> Result<()> {
    let description = match description {
        Some(d) => d.to_string(),
        None => prompts::prompt_description()?,
    };

    let ai = app.ai_client()?;
    if !ai.is_available() {
        anyhow::bail!("AI integration not available ({})", ai.mode_description());
    }
    println!("{}", format!("Extracting model via {}...", ai.mode_description()).cyan());

    let raw = ai.extract_requirements(&description)?;
    let suggestions = raw.junction_suggestions.clone();
    let mut project = normalize_project(raw, app.user());
    if let Some(name) = name {
        project.app_name = name.trim().to_string();
    }
    if project.app_name.is_empty() {
        project.app_name = "Untitled App".to_string();
    }
    if project.description.is_empty() {
        project.description = description.trim().to_string();
    }
    refresh_examples(&mut project, app.config.sample_count);

    if dry_run {
        println!("{}", render_json(&project)?);
    } else {
        let saved = app.backend.save_project(project)?;
        println!("{}", "Project created successfully!".green());
        show_project(&saved);
    }
    print_suggestions(&suggestions);
    Ok(())
}

fn refine_project(app: &App, key: Option<&str>, instruction: &str) -> Result<()> {
    let current = select_project(app, key)?;
    let ai = app.ai_client()?;
    if !ai.is_available() {
        anyhow::bail!("AI integration not available ({})", ai.mode_description());
    }
    println!("{}", format!("Refining '{}' via {}...", current.app_name, ai.mode_description()).cyan());

    let raw = ai.refine_project(&current, instruction)?;
    let suggestions = raw.junction_suggestions.clone();
    let revised = normalize_project(raw, app.user());

    let updated = app
        .backend
        .update_project(&current.id, app.user(), &mut |p| {
            if !revised.app_name.is_empty() {
                p.app_name = revised.app_name.clone();
            }
            if !revised.description.is_empty() {
                p.description = revised.description.clone();
            }
            p.entities = revised.entities.clone();
            p.roles = revised.roles.clone();
            p.features = revised.features.clone();
            refresh_examples(p, app.config.sample_count);
            Ok(())
        })?;

    println!("{}", "Project updated successfully!".green());
    show_project(&updated);
    print_suggestions(&suggestions);
    Ok(())
}

fn import_project(app: &App, file: &Path) -> Result<()> {
    let content =
        fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let raw: RawProject = match file.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML from {}", file.display()))?,
        _ => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse JSON from {}", file.display()))?,
    };

    let suggestions = raw.junction_suggestions.clone();
    let mut project = normalize_project(raw, app.user());
    if project.app_name.is_empty() {
        project.app_name = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Imported App".to_string());
    }

    let saved = app.backend.save_project(project)?;
    println!("{}", format!("Imported '{}' ({})", saved.app_name, saved.id).green());
    print_suggestions(&suggestions);
    Ok(())
}

fn list_projects(app: &App, mine: bool) -> Result<()> {
    let owner = mine.then(|| app.user());
    let projects = app.backend.list_projects(owner)?;

    if projects.is_empty() {
        println!("{}", "No projects found.".yellow());
        return Ok(());
    }

    println!(
        "{:<36} | {:<30} | {:<12} | {:>8} | {:>5} | {:>8} | {:<16}",
        "ID", "Name", "Owner", "Entities", "Roles", "Features", "Modified"
    );
    println!("{}", "-".repeat(130));

    for project in projects {
        let owner = if project.created_by == app.user() {
            project.created_by.green()
        } else {
            project.created_by.normal()
        };
        println!(
            "{:<36} | {:<30} | {:<12} | {:>8} | {:>5} | {:>8} | {:<16}",
            project.id,
            truncate(&project.app_name, 30),
            owner,
            project.entities.len(),
            project.roles.len(),
            project.features.len(),
            project.modified_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

fn show_project(project: &Project) {
    println!("{}", project.app_name.bold());
    println!("ID: {}", project.id);
    println!("Owner: {}", project.created_by);
    if !project.description.is_empty() {
        println!("\n{}", project.description);
    }

    let edges = relationship_edges(&project.entities);
    println!("\n{}", "Entities".underline());
    for entity in &project.entities {
        println!("  {}", entity.name.cyan().bold());
        if let Some(description) = &entity.metadata.description {
            println!("    {}", description.dimmed());
        }
        for field in &entity.fields {
            let marker = if field.required { "*" } else { "" };
            println!("    {}{}: {}", field.name, marker.red(), field.field_type);
        }
        for (rel_type, other) in edges.iter().filter_map(|e| e.seen_from(&entity.name)) {
            println!("    {} {}", rel_type.to_string().dimmed(), other);
        }
        let features: Vec<&str> = project
            .features
            .iter()
            .filter(|f| classify_feature_for_entity(f, &entity.name))
            .map(|f| f.name.as_str())
            .collect();
        if !features.is_empty() {
            println!("    features: {}", features.join(", "));
        }
    }

    println!("\n{}", "Roles".underline());
    for role in &project.roles {
        println!("  {} {}", role.name.cyan().bold(), role.description.dimmed());
        if !role.features.is_empty() {
            println!("    {}", role.features.join(", "));
        }
    }

    println!("\n{}", "Features".underline());
    for feature in &project.features {
        let scope = match feature.category {
            FeatureCategory::Entity => feature.entity_target.clone().unwrap_or_default(),
            FeatureCategory::Relationship => feature.related_entities.join(" <-> "),
        };
        println!(
            "  {} [{}] {} {}",
            feature.id.yellow(),
            feature.category,
            feature.name,
            scope.dimmed()
        );
        for permission in &feature.permissions {
            println!("    {}: {}", permission.role, colored_level(permission.level()));
        }
    }
}

fn delete_project(app: &App, key: Option<&str>, skip_confirm: bool) -> Result<()> {
    let project = select_project(app, key)?;

    println!("{}", "Project to delete:".yellow());
    println!("  ID: {}", project.id);
    println!("  Name: {}", project.app_name);
    println!("  Owner: {}", project.created_by);

    if !skip_confirm && !prompts::confirm("Are you sure you want to delete this project?")? {
        println!("Deletion cancelled.");
        return Ok(());
    }

    app.backend.delete_project(&project.id, app.user())?;
    println!("{}", "Project deleted successfully!".green());
    Ok(())
}

fn handle_export_command(
    app: &App,
    key: Option<&str>,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let format = ExportFormat::parse(format)
        .with_context(|| format!("Unknown export format '{}' (expected markdown or json)", format))?;
    let project = select_project(app, key)?;

    match output {
        Some(path) => {
            export_project(&project, format, path)?;
            println!("{}", format!("Exported to {}", path.display()).green());
        }
        None => match format {
            ExportFormat::Json => println!("{}", render_json(&project)?),
            ExportFormat::Markdown => print!("{}", render_markdown(&project)),
        },
    }
    Ok(())
}

// =============================================================================
// Permissions
// =============================================================================

fn colored_level(level: PermissionLevel) -> colored::ColoredString {
    match level {
        PermissionLevel::None => "-".dimmed(),
        PermissionLevel::Read => "read".yellow(),
        PermissionLevel::Full => "full".green(),
    }
}

fn print_matrix(project: &Project) {
    let matrix = PermissionMatrix::from_project(project);
    if matrix.roles.is_empty() || matrix.features.is_empty() {
        println!("{}", "No roles or features to show.".yellow());
        return;
    }

    let role_width = matrix.roles.iter().map(|r| r.len()).max().unwrap_or(4).max(4);
    let widths: Vec<usize> = matrix.features.iter().map(|f| f.id.len().max(4)).collect();

    print!("{:<width$}", "Role", width = role_width);
    for (column, width) in matrix.features.iter().zip(&widths) {
        print!(" | {:<width$}", column.id, width = *width);
    }
    println!();
    println!("{}", "-".repeat(role_width + widths.iter().map(|w| w + 3).sum::<usize>()));

    for (role, levels) in matrix.rows() {
        print!("{:<width$}", role, width = role_width);
        for (level, width) in levels.iter().zip(&widths) {
            // Pad before coloring; escape codes would break alignment
            let cell = format!("{:<width$}", level.to_string(), width = *width);
            let cell = match level {
                PermissionLevel::None => cell.dimmed(),
                PermissionLevel::Read => cell.yellow(),
                PermissionLevel::Full => cell.green(),
            };
            print!(" | {}", cell);
        }
        println!();
    }

    let (none, read, full) = matrix.counts();
    println!("\n{} full, {} read, {} none", full, read, none);
}

fn parse_level(s: &str) -> Result<PermissionLevel> {
    PermissionLevel::parse(s)
        .with_context(|| format!("Invalid permission level '{}' (expected none, read or full)", s))
}

fn handle_perm_command(cmd: &PermCommand, app: &App, key: Option<&str>) -> Result<()> {
    match cmd {
        PermCommand::Set {
            role,
            feature,
            level,
        } => {
            let project = select_project(app, key)?;
            let level = match level {
                Some(level) => parse_level(level)?,
                None => prompts::prompt_permission_level(
                    role,
                    feature,
                    project.permission(role, feature),
                )?,
            };
            modify_selected(app, &project, |p| Ok(p.set_permission(role, feature, level)?))?;
            println!("{} -> {}: {}", role, feature, colored_level(level));
        }
        PermCommand::Toggle { role, feature } => {
            let mut new_level = PermissionLevel::None;
            modify_project(app, key, |p| {
                new_level = p.toggle_permission(role, feature)?;
                Ok(())
            })?;
            println!("{} -> {}: {}", role, feature, colored_level(new_level));
        }
    }
    Ok(())
}

// =============================================================================
// Entities
// =============================================================================

/// Parses `name:type[:required]`
fn parse_field_spec(spec: &str) -> Result<EntityField> {
    let mut parts = spec.split(':').map(str::trim);
    let name = parts.next().filter(|n| !n.is_empty()).with_context(|| {
        format!("Invalid field '{}' (expected name:type[:required])", spec)
    })?;
    let field_type = match parts.next() {
        Some(t) => FieldType::parse(t).with_context(|| {
            format!(
                "Unknown field type '{}' (expected one of {})",
                t,
                FieldType::all()
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })?,
        None => FieldType::Text,
    };

    let field = EntityField::new(name, field_type);
    match parts.next() {
        Some("required") | Some("req") => Ok(field.required()),
        Some(other) => anyhow::bail!("Unknown field flag '{}' in '{}'", other, spec),
        None => Ok(field),
    }
}

/// Parses `type:Entity`
fn parse_relationship_spec(spec: &str) -> Result<EntityRelationship> {
    let (rel_type, entity) = spec
        .split_once(':')
        .with_context(|| format!("Invalid relationship '{}' (expected type:Entity)", spec))?;
    let rel_type = RelationshipType::parse(rel_type)
        .with_context(|| format!("Unknown relationship type '{}'", rel_type))?;
    Ok(EntityRelationship::new(rel_type, entity.trim()))
}

fn handle_entity_command(cmd: &EntityCommand, app: &App, key: Option<&str>) -> Result<()> {
    match cmd {
        EntityCommand::Add {
            name,
            fields,
            relationships,
            description,
        } => {
            let mut entity = Entity::new(name.as_str());
            for spec in fields {
                entity = entity.with_field(parse_field_spec(spec)?);
            }
            for spec in relationships {
                entity.relationships.push(parse_relationship_spec(spec)?);
            }
            entity.metadata.description = description.clone();

            let updated = modify_project(app, key, |p| Ok(p.add_entity(entity.clone())?))?;
            let kept = updated
                .entity(name.trim())
                .map(|e| e.relationships.len())
                .unwrap_or(0);
            if kept < relationships.len() {
                println!(
                    "{}",
                    "Relationships to unknown entities were skipped.".yellow()
                );
            }
            println!("{}", format!("Entity '{}' added", name.trim()).green());
        }
        EntityCommand::Edit {
            name,
            drop_fields,
            add_fields,
            drop_relationships,
            add_relationships,
            description,
        } => {
            let added_fields = add_fields
                .iter()
                .map(|s| parse_field_spec(s))
                .collect::<Result<Vec<_>>>()?;
            let added_relationships = add_relationships
                .iter()
                .map(|s| parse_relationship_spec(s))
                .collect::<Result<Vec<_>>>()?;

            modify_project(app, key, |p| {
                let mut session = EditSession::begin(p, name)?;
                let entity = session.preview();

                for field in drop_fields {
                    let index = entity
                        .fields
                        .iter()
                        .position(|f| &f.name == field)
                        .with_context(|| format!("Field '{}' not found on {}", field, name))?;
                    session.mark_field_removed(index)?;
                }
                for target in drop_relationships {
                    let mut found = false;
                    for (index, rel) in entity.relationships.iter().enumerate() {
                        if &rel.entity == target {
                            session.mark_relationship_removed(index)?;
                            found = true;
                        }
                    }
                    if !found {
                        anyhow::bail!("{} has no relationship to {}", name, target);
                    }
                }
                for field in &added_fields {
                    session.add_field(field.clone())?;
                }
                for rel in &added_relationships {
                    session.add_relationship(rel.clone());
                }
                if description.is_some() {
                    session.set_description(description.clone());
                }

                if !session.is_dirty() {
                    anyhow::bail!("Nothing to change on {}", name);
                }
                session.commit(p)?;
                Ok(())
            })?;
            println!("{}", format!("Entity '{}' updated", name).green());
        }
        EntityCommand::Remove { name, yes } => {
            if !yes
                && !prompts::confirm(&format!(
                    "Remove '{}' with its relationships and features?",
                    name
                ))?
            {
                println!("Removal cancelled.");
                return Ok(());
            }

            let mut removal = None;
            modify_project(app, key, |p| {
                removal = Some(p.remove_entity(name)?);
                Ok(())
            })?;
            if let Some(removal) = removal {
                println!("{}", format!("Entity '{}' removed", removal.entity).green());
                if removal.pruned_relationships > 0 {
                    println!("  {} relationship(s) pruned", removal.pruned_relationships);
                }
                if !removal.removed_features.is_empty() {
                    println!("  features removed: {}", removal.removed_features.join(", "));
                }
            }
        }
        EntityCommand::Rename { old, new } => {
            modify_project(app, key, |p| Ok(p.rename_entity(old, new)?))?;
            println!("{}", format!("Entity '{}' renamed to '{}'", old, new.trim()).green());
        }
    }
    Ok(())
}

// =============================================================================
// Roles
// =============================================================================

fn handle_role_command(cmd: &RoleCommand, app: &App, key: Option<&str>) -> Result<()> {
    match cmd {
        RoleCommand::Add { name, description } => {
            let role = Role::new(name.as_str(), description.as_str());
            modify_project(app, key, |p| Ok(p.add_role(role.clone())?))?;
            println!("{}", format!("Role '{}' added", name.trim()).green());
        }
        RoleCommand::Remove { name, yes } => {
            if !yes && !prompts::confirm(&format!("Remove role '{}'?", name))? {
                println!("Removal cancelled.");
                return Ok(());
            }
            let mut revoked = 0;
            modify_project(app, key, |p| {
                revoked = p.remove_role(name)?;
                Ok(())
            })?;
            println!(
                "{}",
                format!("Role '{}' removed ({} permission(s) revoked)", name, revoked).green()
            );
        }
        RoleCommand::Rename { old, new } => {
            modify_project(app, key, |p| Ok(p.rename_role(old, new)?))?;
            println!("{}", format!("Role '{}' renamed to '{}'", old, new.trim()).green());
        }
    }
    Ok(())
}

// =============================================================================
// Features
// =============================================================================

/// Parses `Role=level`
fn parse_grant(spec: &str) -> Result<(String, PermissionLevel)> {
    let (role, level) = spec
        .split_once('=')
        .with_context(|| format!("Invalid grant '{}' (expected Role=level)", spec))?;
    Ok((role.trim().to_string(), parse_level(level)?))
}

fn handle_feature_command(cmd: &FeatureCommand, app: &App, key: Option<&str>) -> Result<()> {
    match cmd {
        FeatureCommand::Add {
            name,
            id,
            entity,
            relates,
            show_in,
            description,
            grants,
        } => {
            let grants = grants
                .iter()
                .map(|g| parse_grant(g))
                .collect::<Result<Vec<_>>>()?;

            let mut new_id = String::new();
            modify_project(app, key, |p| {
                let category = if !relates.is_empty() {
                    FeatureCategory::Relationship
                } else if entity.is_some() {
                    FeatureCategory::Entity
                } else {
                    guess_category(name, &p.entities)
                };
                let mut feature = Feature {
                    id: id.clone().unwrap_or_default(),
                    name: name.clone(),
                    description: description.clone(),
                    category,
                    entity_target: entity.clone(),
                    related_entities: relates.clone(),
                    show_in_entity_lists: show_in.clone(),
                    ..Default::default()
                };
                for (role, level) in &grants {
                    if !p.has_role(role) {
                        anyhow::bail!("Role not found: {}", role);
                    }
                    feature = feature.with_permission(role, *level);
                }
                new_id = p.add_feature(feature)?;
                Ok(())
            })?;
            println!("{}", format!("Feature '{}' added as {}", name.trim(), new_id).green());
        }
        FeatureCommand::Remove { feature, yes } => {
            if !yes && !prompts::confirm(&format!("Remove feature '{}'?", feature))? {
                println!("Removal cancelled.");
                return Ok(());
            }
            let mut removed = None;
            modify_project(app, key, |p| {
                removed = Some(p.remove_feature(feature)?);
                Ok(())
            })?;
            if let Some(removed) = removed {
                println!("{}", format!("Feature '{}' removed", removed.name).green());
            }
        }
    }
    Ok(())
}

// =============================================================================
// Store
// =============================================================================

fn handle_db_command(cmd: &DbCommand, app: &App) -> Result<()> {
    match cmd {
        DbCommand::Path => {
            let stats = app.backend.stats()?;
            println!("{}", app.backend.path().display());
            println!(
                "{} store: {} project(s), {} entities, {} features",
                stats.backend_type, stats.project_count, stats.entity_count, stats.feature_count
            );
        }
        DbCommand::Migrate { to, backend } => {
            let backend_type = backend
                .as_deref()
                .map(|b| {
                    BackendType::parse(b)
                        .with_context(|| format!("Unknown backend '{}' (expected yaml or sqlite)", b))
                })
                .transpose()?;
            let target = db::create_backend(to, backend_type)?;
            let count = db::migrate(app.backend.as_ref(), target.as_ref())?;
            println!(
                "{}",
                format!(
                    "Migrated {} project(s) to {} store {}",
                    count,
                    target.backend_type(),
                    to.display()
                )
                .green()
            );
        }
        DbCommand::Export { file } => {
            export_backend_to_json(app.backend.as_ref(), file)?;
            println!("{}", format!("Exported store to {}", file.display()).green());
        }
        DbCommand::Import { file } => {
            let count = import_json_to_backend(file, app.backend.as_ref(), app.user())?;
            println!("{}", format!("Imported {} project(s)", count).green());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use protospirit_core::demo_project;
    use tempfile::TempDir;

    #[test]
    fn test_parse_field_spec() {
        let field = parse_field_spec("email:email:required").unwrap();
        assert_eq!(field.name, "email");
        assert_eq!(field.field_type, FieldType::Email);
        assert!(field.required);

        let field = parse_field_spec("notes").unwrap();
        assert_eq!(field.field_type, FieldType::Text);
        assert!(!field.required);

        assert!(parse_field_spec(":text").is_err());
        assert!(parse_field_spec("age:integer-ish").is_err());
        assert!(parse_field_spec("age:number:maybe").is_err());
    }

    #[test]
    fn test_parse_relationship_spec() {
        let rel = parse_relationship_spec("many-to-one:Author").unwrap();
        assert_eq!(rel.rel_type, RelationshipType::ManyToOne);
        assert_eq!(rel.entity, "Author");
        assert!(parse_relationship_spec("Author").is_err());
        assert!(parse_relationship_spec("sideways:Author").is_err());
    }

    #[test]
    fn test_parse_grant() {
        assert_eq!(
            parse_grant("Admin=full").unwrap(),
            ("Admin".to_string(), PermissionLevel::Full)
        );
        assert!(parse_grant("Admin").is_err());
        assert!(parse_grant("Admin=write").is_err());
    }

    fn app_with_two_projects(dir: &TempDir) -> (App, Project, Project) {
        let config = AppConfig {
            data_path: dir.path().join("projects.yaml"),
            default_user: "alice".to_string(),
            seed_demo: false,
            ..AppConfig::default()
        };
        let app = startup(&config).unwrap();
        let first = app.backend.save_project(demo_project("alice").unwrap()).unwrap();
        let mut second = demo_project("alice").unwrap();
        second.app_name = "Second Campus".to_string();
        let second = app.backend.save_project(second).unwrap();
        (app, first, second)
    }

    #[test]
    fn test_modify_selected_writes_only_the_chosen_project() {
        let dir = TempDir::new().unwrap();
        let (app, first, second) = app_with_two_projects(&dir);
        assert_eq!(second.permission("Student", "manage-students"), PermissionLevel::None);

        let updated = modify_selected(&app, &second, |p| {
            Ok(p.set_permission("Student", "manage-students", PermissionLevel::Full)?)
        })
        .unwrap();
        assert_eq!(updated.id, second.id);

        let second = app.backend.get_project(&second.id).unwrap().unwrap();
        let first = app.backend.get_project(&first.id).unwrap().unwrap();
        assert_eq!(second.permission("Student", "manage-students"), PermissionLevel::Full);
        assert_eq!(first.permission("Student", "manage-students"), PermissionLevel::None);
    }

    #[test]
    fn test_modify_project_by_name_key() {
        let dir = TempDir::new().unwrap();
        let (app, first, _) = app_with_two_projects(&dir);

        modify_project(&app, Some("second campus"), |p| Ok(p.add_role(Role::new("Guest", ""))?))
            .unwrap();
        let names: Vec<String> = app
            .backend
            .list_projects(None)
            .unwrap()
            .into_iter()
            .filter(|p| p.has_role("Guest"))
            .map(|p| p.app_name)
            .collect();
        assert_eq!(names, vec!["Second Campus".to_string()]);
        assert!(!app.backend.get_project(&first.id).unwrap().unwrap().has_role("Guest"));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Library", 30), "Library");
        assert_eq!(truncate("A very long application name indeed", 10), "A very ...");
    }
}
