use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Model applications as entities, roles, features and permissions"
)]
pub struct Cli {
    /// Path to the project store (.yaml or .db)
    #[clap(long, global = true)]
    pub db: Option<String>,

    /// Act as this user
    #[clap(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Project name or ID; prompts when omitted and there is a choice
    #[clap(long, short = 'p', global = true)]
    pub project: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Extract a new project from a plain-language description using AI
    Extract {
        /// Application description (prompts when omitted)
        description: Option<String>,

        /// Override the extracted application name
        #[clap(long)]
        name: Option<String>,

        /// Print the normalized model instead of saving it
        #[clap(long)]
        dry_run: bool,
    },

    /// Ask the AI to revise an existing project
    Refine {
        /// What to change
        instruction: String,
    },

    /// Import a project from a JSON or YAML model file
    Import {
        /// Path to the model file
        file: PathBuf,
    },

    /// List projects
    List {
        /// Only projects created by the current user
        #[clap(long)]
        mine: bool,
    },

    /// Show a project
    Show,

    /// Delete a project
    Delete {
        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Export a project as markdown or JSON
    Export {
        /// Output format (markdown, json)
        #[clap(long, short = 'f', default_value = "markdown")]
        format: String,

        /// Output file (defaults to stdout)
        #[clap(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// Print the role x feature permission matrix
    Matrix,

    /// Permission management
    #[clap(subcommand)]
    Perm(PermCommand),

    /// Entity management
    #[clap(subcommand)]
    Entity(EntityCommand),

    /// Role management
    #[clap(subcommand)]
    Role(RoleCommand),

    /// Feature management
    #[clap(subcommand)]
    Feature(FeatureCommand),

    /// Regenerate sample records for every entity
    Samples {
        /// Records per entity (defaults to the configured count)
        #[clap(long, short = 'n')]
        count: Option<usize>,
    },

    /// Store management
    #[clap(subcommand)]
    Db(DbCommand),
}

#[derive(Subcommand, Debug)]
pub enum PermCommand {
    /// Set a role's access to a feature
    Set {
        /// Role name
        role: String,

        /// Feature ID or name
        feature: String,

        /// none, read or full (prompts when omitted)
        level: Option<String>,
    },

    /// Cycle a role's access to a feature: none -> read -> full -> none
    Toggle {
        /// Role name
        role: String,

        /// Feature ID or name
        feature: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum EntityCommand {
    /// Add an entity
    Add {
        /// Entity name
        name: String,

        /// Field as name:type[:required], repeatable
        #[clap(long = "field")]
        fields: Vec<String>,

        /// Relationship as type:Entity (e.g. many-to-one:Author), repeatable
        #[clap(long = "rel")]
        relationships: Vec<String>,

        /// What the entity represents
        #[clap(long)]
        description: Option<String>,
    },

    /// Edit an entity's fields, relationships and description in one step
    Edit {
        /// Entity name
        name: String,

        /// Field to remove, repeatable
        #[clap(long = "drop-field")]
        drop_fields: Vec<String>,

        /// Field to add as name:type[:required], repeatable
        #[clap(long = "add-field")]
        add_fields: Vec<String>,

        /// Remove every relationship to this entity, repeatable
        #[clap(long = "drop-rel")]
        drop_relationships: Vec<String>,

        /// Relationship to add as type:Entity, repeatable
        #[clap(long = "add-rel")]
        add_relationships: Vec<String>,

        /// New description
        #[clap(long)]
        description: Option<String>,
    },

    /// Remove an entity along with its relationships and features
    Remove {
        /// Entity name
        name: String,

        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Rename an entity everywhere it is referenced
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum RoleCommand {
    /// Add a role
    Add {
        /// Role name
        name: String,

        /// Who the role is
        #[clap(long, default_value = "")]
        description: String,
    },

    /// Remove a role and every permission granted to it
    Remove {
        /// Role name
        name: String,

        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },

    /// Rename a role, keeping its permissions
    Rename {
        /// Current name
        old: String,

        /// New name
        new: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FeatureCommand {
    /// Add a feature
    Add {
        /// Feature name
        name: String,

        /// Feature ID (derived from the name when omitted)
        #[clap(long)]
        id: Option<String>,

        /// Entity managed by this feature
        #[clap(long)]
        entity: Option<String>,

        /// The two entities a relationship feature connects
        #[clap(long, num_args = 2, value_names = ["A", "B"])]
        relates: Vec<String>,

        /// Related entity whose list shows this feature, repeatable
        #[clap(long = "show-in")]
        show_in: Vec<String>,

        /// What the feature does
        #[clap(long, default_value = "")]
        description: String,

        /// Grant as Role=level (read or full), repeatable
        #[clap(long = "grant")]
        grants: Vec<String>,
    },

    /// Remove a feature
    Remove {
        /// Feature ID or name
        feature: String,

        /// Skip confirmation
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Print the store location and statistics
    Path,

    /// Copy every project into another store, replacing its contents
    Migrate {
        /// Destination file (.yaml or .db)
        to: PathBuf,

        /// Destination backend (yaml, sqlite); inferred from the extension
        #[clap(long)]
        backend: Option<String>,
    },

    /// Write every project to a JSON file
    Export {
        /// Destination JSON file
        file: PathBuf,
    },

    /// Merge projects from a JSON export into the store
    Import {
        /// Source JSON file
        file: PathBuf,
    },
}
