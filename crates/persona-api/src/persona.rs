use std::sync::Arc;

use crate::config::{PersonaConfig, PersonasConfig};
use crate::error::{ApiError, ApiResult};

/// Fixed assistant voice: a name and the system prompt sent ahead of every
/// conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Persona {
    pub name: String,
    pub system_prompt: String,
}

impl Persona {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
        }
    }

    /// Resolve the prompt, reading `prompt_file` once when no inline prompt is set
    pub fn from_config(config: &PersonaConfig) -> ApiResult<Self> {
        let prompt = match (&config.prompt, &config.prompt_file) {
            (Some(prompt), _) => prompt.clone(),
            (None, Some(path)) => std::fs::read_to_string(path).map_err(|e| {
                ApiError::Config(format!(
                    "Failed to read prompt for persona '{}' from {}: {}",
                    config.name, path, e
                ))
            })?,
            (None, None) => {
                return Err(ApiError::Config(format!(
                    "Persona '{}' needs either prompt or prompt_file",
                    config.name
                )))
            }
        };

        if prompt.trim().is_empty() {
            return Err(ApiError::Config(format!(
                "Persona '{}' has an empty system prompt",
                config.name
            )));
        }

        Ok(Self::new(config.name.clone(), prompt))
    }
}

/// The two personas served by the chat routes
#[derive(Debug, Clone)]
pub struct Personas {
    pub a: Arc<Persona>,
    pub b: Arc<Persona>,
}

impl Personas {
    pub fn new(a: Persona, b: Persona) -> Self {
        Self {
            a: Arc::new(a),
            b: Arc::new(b),
        }
    }

    pub fn from_config(config: &PersonasConfig) -> ApiResult<Self> {
        Ok(Self::new(
            Persona::from_config(&config.a)?,
            Persona::from_config(&config.b)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prompt(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("persona-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_inline_prompt() {
        let persona = Persona::from_config(&PersonaConfig::inline("A", "You are A")).unwrap();
        assert_eq!(persona, Persona::new("A", "You are A"));
    }

    #[test]
    fn test_prompt_file() {
        let path = temp_prompt("You are B.\nBe kind.");
        let config = PersonaConfig::from_file("B", path.to_string_lossy());

        let persona = Persona::from_config(&config).unwrap();
        assert_eq!(persona.system_prompt, "You are B.\nBe kind.");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_inline_wins_over_file() {
        let config = PersonaConfig {
            name: "A".to_string(),
            prompt: Some("inline".to_string()),
            prompt_file: Some("/nonexistent/prompt.txt".to_string()),
        };
        assert_eq!(Persona::from_config(&config).unwrap().system_prompt, "inline");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let config = PersonaConfig::from_file("A", "/nonexistent/prompt.txt");
        let err = Persona::from_config(&config).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/prompt.txt"));
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = Persona::from_config(&PersonaConfig::inline("A", "  \n")).unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_no_prompt_source() {
        let config = PersonaConfig {
            name: "A".to_string(),
            ..PersonaConfig::default()
        };
        assert!(Persona::from_config(&config).is_err());
    }
}
