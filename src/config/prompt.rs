use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::info;

/// Persona shipped with the binary; `--persona-path` replaces it.
pub const DEFAULT_PERSONA: &str = include_str!("../../prompts/persona.md");

#[derive(Debug)]
pub enum PromptError {
    Empty(String),
    IoError(String, std::io::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Empty(path) => write!(f, "Persona file '{}' is empty", path),
            PromptError::IoError(path, e) => write!(f, "Failed to read persona file '{}': {}", path, e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(_, e) => Some(e),
            _ => None,
        }
    }
}

pub fn load_persona(path: Option<&str>) -> Result<Arc<str>, PromptError> {
    let Some(path) = path else {
        info!("Using built-in persona prompt ({} chars)", DEFAULT_PERSONA.len());
        return Ok(Arc::from(DEFAULT_PERSONA.trim()));
    };

    let content = fs::read_to_string(path).map_err(|e| PromptError::IoError(path.to_string(), e))?;
    let persona = content.trim();
    if persona.is_empty() {
        return Err(PromptError::Empty(path.to_string()));
    }
    info!("Loaded persona prompt from '{}' ({} chars)", path, persona.len());
    Ok(Arc::from(persona))
}
