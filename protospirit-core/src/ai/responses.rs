//! Response Parsing Module
//!
//! Parses JSON responses from AI into raw project data.

use crate::ai::client::AiError;
use crate::input::RawProject;

/// Extract JSON from a response that may contain markdown code blocks
fn extract_json(response: &str) -> &str {
    // Look for JSON in markdown code block
    if let Some(start) = response.find("```json") {
        let json_start = start + 7; // Skip "```json"
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim();
        }
    }

    // Look for generic code block
    if let Some(start) = response.find("```") {
        let code_start = start + 3;
        // Skip language identifier if present
        let json_start = if let Some(newline) = response[code_start..].find('\n') {
            code_start + newline + 1
        } else {
            code_start
        };
        if let Some(end) = response[json_start..].find("```") {
            return response[json_start..json_start + end].trim();
        }
    }

    // Try to find JSON object directly
    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end > start {
                return &response[start..=end];
            }
        }
    }

    response.trim()
}

/// Parse an extraction or refinement response from AI
pub fn parse_model_response(response: &str) -> Result<RawProject, AiError> {
    let json_str = extract_json(response);
    let raw: RawProject = serde_json::from_str(json_str).map_err(|e| {
        let preview: String = json_str.chars().take(200).collect();
        AiError::InvalidResponse(format!(
            "Failed to parse model response: {}. JSON: {}",
            e, preview
        ))
    })?;

    if raw.entities.is_empty() {
        return Err(AiError::InvalidResponse(
            "Model response contained no entities".to_string(),
        ));
    }

    Ok(raw)
}
