//! Application startup: configuration in, ready-to-use backend out.

use anyhow::{Context, Result};
use log::info;

use crate::ai::{AiClient, AiError};
use crate::config::AppConfig;
use crate::db::{self, ProjectBackend};
use crate::error::ModelError;
use crate::models::{
    Entity, EntityField, Feature, FieldType, FieldValidation, PermissionLevel, Project,
    RelationshipType, Role,
};
use crate::samples::refresh_examples;

/// Everything a front end needs after startup
pub struct App {
    pub config: AppConfig,
    pub backend: Box<dyn ProjectBackend>,
}

impl App {
    /// The acting user for ownership checks
    pub fn user(&self) -> &str {
        &self.config.default_user
    }

    /// Builds an AI client honoring the configured CLI path
    pub fn ai_client(&self) -> Result<AiClient, AiError> {
        AiClient::with_cli_path(self.config.claude_path.as_deref())
    }
}

/// Validates `config`, opens its backend (creating an empty store when
/// missing) and seeds the demo project when asked to. Only a store created
/// by this call is seeded, so emptying an existing store sticks.
pub fn startup(config: &AppConfig) -> Result<App> {
    config.validate().context("Invalid configuration")?;

    let db_config = config.database_config()?;
    let created = !db_config.path.exists();
    let backend = db::open_or_create(&db_config)
        .with_context(|| format!("Failed to open project store {:?}", db_config.path))?;
    info!(
        "Using {} store at {:?}",
        db_config.backend_type, db_config.path
    );

    if created && config.seed_demo {
        let mut demo = demo_project(&config.default_user)?;
        refresh_examples(&mut demo, config.sample_count);
        let demo = backend.save_project(demo)?;
        info!("Seeded demo project '{}'", demo.app_name);
    }

    Ok(App {
        config: config.clone(),
        backend,
    })
}

/// A small course-enrollment model exercising every kind of feature
pub fn demo_project(user: &str) -> Result<Project, ModelError> {
    let mut project = Project::new(
        "Course Enrollment",
        "Students enroll in courses taught by instructors.",
        user,
    );

    // Assigned together since the relationships refer to each other
    project.entities = vec![
        Entity::new("Student")
            .with_field(EntityField::new("name", FieldType::Text).required())
            .with_field(EntityField::new("email", FieldType::Email).required())
            .with_field(EntityField::new("enrolledOn", FieldType::Date))
            .with_relationship(RelationshipType::ManyToMany, "Course"),
        Entity::new("Course")
            .with_field(EntityField::new("title", FieldType::Text).required())
            .with_field(EntityField {
                validation: Some(FieldValidation {
                    min: Some(1.0),
                    max: Some(6.0),
                    ..Default::default()
                }),
                ..EntityField::new("credits", FieldType::Number)
            })
            .with_field(EntityField {
                validation: Some(FieldValidation {
                    options: Some(vec![
                        "Fall".to_string(),
                        "Spring".to_string(),
                        "Summer".to_string(),
                    ]),
                    ..Default::default()
                }),
                ..EntityField::new("term", FieldType::Select)
            })
            .with_field(EntityField::new("syllabus", FieldType::Textarea))
            .with_relationship(RelationshipType::ManyToMany, "Student")
            .with_relationship(RelationshipType::ManyToOne, "Instructor"),
        Entity::new("Instructor")
            .with_field(EntityField::new("name", FieldType::Text).required())
            .with_field(EntityField::new("tenured", FieldType::Boolean))
            .with_relationship(RelationshipType::OneToMany, "Course"),
    ];

    project.add_role(Role::new("Admin", "Runs the registrar's office"))?;
    project.add_role(Role::new("Instructor", "Teaches courses"))?;
    project.add_role(Role::new("Student", "Takes courses"))?;

    let mut enroll = Feature::relationship("enroll-students", "Enroll Students", "Student", "Course")
        .with_permission("Admin", PermissionLevel::Full)
        .with_permission("Instructor", PermissionLevel::Read)
        .with_permission("Student", PermissionLevel::Read);
    enroll.show_in_entity_lists = vec!["Course".to_string()];

    project.add_feature(
        Feature::entity("manage-students", "Manage Students", "Student")
            .with_permission("Admin", PermissionLevel::Full)
            .with_permission("Instructor", PermissionLevel::Read),
    )?;
    project.add_feature(
        Feature::entity("manage-courses", "Manage Courses", "Course")
            .with_permission("Admin", PermissionLevel::Full)
            .with_permission("Instructor", PermissionLevel::Full)
            .with_permission("Student", PermissionLevel::Read),
    )?;
    project.add_feature(
        Feature::entity("manage-instructors", "Manage Instructors", "Instructor")
            .with_permission("Admin", PermissionLevel::Full),
    )?;
    project.add_feature(enroll)?;

    Ok(project)
}
