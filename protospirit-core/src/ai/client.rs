//! AI Client Module
//!
//! Handles communication with Claude via CLI or direct API.

use crate::ai::prompts;
use crate::ai::responses;
use crate::input::RawProject;
use crate::models::Project;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Errors that can occur during AI operations
#[derive(Error, Debug)]
pub enum AiError {
    #[error("Claude CLI not found at {0}")]
    CliNotFound(PathBuf),

    #[error("Claude CLI execution failed: {0}")]
    CliExecFailed(String),

    #[error("API key missing")]
    ApiKeyMissing,

    #[error("Invalid response from AI: {0}")]
    InvalidResponse(String),

    #[error("Application description is empty")]
    EmptyDescription,

    #[error("AI integration not available")]
    NotAvailable,
}

/// AI operation mode
#[derive(Debug, Clone, Default)]
pub enum AiMode {
    /// Use Claude CLI with --print flag
    ClaudeCli { path: PathBuf },
    /// Direct API integration (not wired yet)
    DirectApi { api_key: String },
    /// AI features disabled
    #[default]
    Disabled,
}

/// AI Client for interacting with Claude
#[derive(Debug, Clone)]
pub struct AiClient {
    mode: AiMode,
}

impl Default for AiClient {
    fn default() -> Self {
        Self::new()
    }
}

impl AiClient {
    /// Create a new AI client with auto-detected mode
    pub fn new() -> Self {
        let mode = Self::detect_mode();
        Self { mode }
    }

    /// Create a client with a specific mode
    pub fn with_mode(mode: AiMode) -> Self {
        Self { mode }
    }

    /// Create a client using an explicit CLI path, or auto-detect when
    /// none is given
    pub fn with_cli_path(path: Option<&Path>) -> Result<Self, AiError> {
        match path {
            Some(path) if path.exists() => Ok(Self::with_mode(AiMode::ClaudeCli {
                path: path.to_path_buf(),
            })),
            Some(path) => Err(AiError::CliNotFound(path.to_path_buf())),
            None => Ok(Self::new()),
        }
    }

    /// Detect the best available AI mode
    fn detect_mode() -> AiMode {
        if let Some(path) = Self::find_claude_cli() {
            return AiMode::ClaudeCli { path };
        }

        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            if !api_key.is_empty() {
                return AiMode::DirectApi { api_key };
            }
        }

        AiMode::Disabled
    }

    /// Find the claude CLI executable
    fn find_claude_cli() -> Option<PathBuf> {
        if let Ok(output) = Command::new("which").arg("claude").output() {
            if output.status.success() {
                let path_str = String::from_utf8_lossy(&output.stdout);
                let path = PathBuf::from(path_str.trim());
                if path.exists() {
                    return Some(path);
                }
            }
        }

        for candidate in ["/usr/local/bin/claude", "/usr/bin/claude"] {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Some(path);
            }
        }

        // npm global install under the home directory
        if let Some(home) = dirs::home_dir() {
            let npm_global = home.join(".npm-global/bin/claude");
            if npm_global.exists() {
                return Some(npm_global);
            }
        }

        None
    }

    /// Check if AI features are available
    pub fn is_available(&self) -> bool {
        match &self.mode {
            AiMode::ClaudeCli { path } => path.exists(),
            AiMode::DirectApi { .. } => false,
            AiMode::Disabled => false,
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> &AiMode {
        &self.mode
    }

    /// Get a description of the current mode
    pub fn mode_description(&self) -> String {
        match &self.mode {
            AiMode::ClaudeCli { path } => format!("Claude CLI ({})", path.display()),
            AiMode::DirectApi { .. } => "Direct API (not supported yet)".to_string(),
            AiMode::Disabled => "Disabled".to_string(),
        }
    }

    /// Extract a raw application model from a plain-language description
    pub fn extract_requirements(&self, description: &str) -> Result<RawProject, AiError> {
        if description.trim().is_empty() {
            return Err(AiError::EmptyDescription);
        }
        let prompt = prompts::build_extraction_prompt(description);
        let response = self.send_request(&prompt)?;
        let raw = responses::parse_model_response(&response)?;
        info!(
            "Extracted {} entities, {} roles, {} features",
            raw.entities.len(),
            raw.roles.len(),
            raw.features.len()
        );
        Ok(raw)
    }

    /// Ask for a revised model of an existing project
    pub fn refine_project(&self, project: &Project, instruction: &str) -> Result<RawProject, AiError> {
        if instruction.trim().is_empty() {
            return Err(AiError::EmptyDescription);
        }
        let prompt = prompts::build_refine_prompt(project, instruction);
        let response = self.send_request(&prompt)?;
        responses::parse_model_response(&response)
    }

    /// Send a request to the AI
    fn send_request(&self, prompt: &str) -> Result<String, AiError> {
        match &self.mode {
            AiMode::ClaudeCli { path } => self.send_cli_request(path, prompt),
            AiMode::DirectApi { api_key } if api_key.is_empty() => Err(AiError::ApiKeyMissing),
            AiMode::DirectApi { .. } => Err(AiError::NotAvailable),
            AiMode::Disabled => Err(AiError::NotAvailable),
        }
    }

    /// Send request via Claude CLI
    fn send_cli_request(&self, cli_path: &Path, prompt: &str) -> Result<String, AiError> {
        debug!("Sending {} byte prompt to {}", prompt.len(), cli_path.display());

        // --print for non-interactive output, -p to pass the prompt
        let output = Command::new(cli_path)
            .arg("--print")
            .arg("-p")
            .arg(prompt)
            .output()
            .map_err(|e| AiError::CliExecFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AiError::CliExecFailed(format!(
                "Exit code: {:?}, stderr: {}",
                output.status.code(),
                stderr
            )));
        }

        let response = String::from_utf8_lossy(&output.stdout).to_string();

        if response.is_empty() {
            return Err(AiError::InvalidResponse("Empty response from CLI".to_string()));
        }

        Ok(response)
    }
}
