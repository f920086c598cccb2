use anyhow::{Context, Result};
use inquire::{Confirm, Editor, Select};
use uuid::Uuid;

use protospirit_core::{PermissionLevel, Project};

/// Asks a yes/no question, defaulting to no
pub fn confirm(message: &str) -> Result<bool> {
    Ok(Confirm::new(message).with_default(false).prompt()?)
}

/// Prompts for a plain-language application description
pub fn prompt_description() -> Result<String> {
    let description = Editor::new("Describe the application:")
        .with_help_message("Who uses it, what they manage, and how things relate")
        .prompt()?;

    if description.trim().is_empty() {
        anyhow::bail!("Description is required");
    }
    Ok(description)
}

/// Prompts the user to pick one of `projects`
pub fn prompt_select_project(projects: &[Project]) -> Result<Uuid> {
    let options: Vec<String> = projects
        .iter()
        .map(|p| format!("{} ({})", p.app_name, p.id))
        .collect();

    let selection = Select::new("Select a project:", options.clone()).prompt()?;

    let index = options
        .iter()
        .position(|o| o == &selection)
        .context("Selected project vanished")?;
    Ok(projects[index].id)
}

/// Prompts for a permission level, starting at `current`
pub fn prompt_permission_level(
    role: &str,
    feature: &str,
    current: PermissionLevel,
) -> Result<PermissionLevel> {
    let levels = vec![
        PermissionLevel::None,
        PermissionLevel::Read,
        PermissionLevel::Full,
    ];
    let start = levels.iter().position(|l| *l == current).unwrap_or(0);

    let level = Select::new(&format!("Access of {} to {}:", role, feature), levels)
        .with_starting_cursor(start)
        .prompt()?;
    Ok(level)
}
