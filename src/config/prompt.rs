use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;
use thiserror::Error;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful, friendly, assistant.";
pub const DEFAULT_WELCOME_MESSAGE: &str =
    "Hi there! I'm Chatbot UI, an AI assistant. I can help you with things like answering questions, providing information, and helping with tasks. How can I help you?";
pub const DEFAULT_CHAR_LIMIT: usize = 12_000;
pub const DEFAULT_MAX_TOKENS: u32 = 800;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("Prompt file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Prompt JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid prompt configuration: {0}")]
    Invalid(String),
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PromptConfig {
    pub system_prompt: String,
    pub welcome_message: String,
    pub char_limit: usize,
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            welcome_message: DEFAULT_WELCOME_MESSAGE.to_string(),
            char_limit: DEFAULT_CHAR_LIMIT,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.0,
            last_loaded: None,
        }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if self.char_limit == 0 {
            return Err(PromptError::Invalid("char_limit must be greater than zero".to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(
                PromptError::Invalid(format!("temperature {} is outside 0.0..=2.0", self.temperature))
            );
        }
        Ok(())
    }
}

pub fn load_prompts_from_str(json: &str) -> Result<Arc<PromptConfig>, PromptError> {
    let config: PromptConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(Arc::new(config))
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let json_str = fs::read_to_string(path)?;
    let mut config: PromptConfig = serde_json::from_str(&json_str)?;
    config.validate()?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Loads the prompt file if it exists, otherwise falls back to the built-in
/// defaults.
pub fn load_prompts_or_default<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let path = path.as_ref();
    if path.exists() {
        info!("Loading prompts from: {}", path.display());
        load_prompts(path)
    } else {
        info!("Prompts file {} not found, using defaults", path.display());
        Ok(Arc::new(PromptConfig::default()))
    }
}

pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let metadata = fs::metadata(path)?;

    if let Ok(modified) = metadata.modified() {
        match current_config.last_loaded {
            Some(last_loaded) if modified <= last_loaded => {}
            Some(_) => {
                info!("Prompts file changed, reloading...");
                return load_prompts(path).map(Some);
            }
            None => {
                info!("No last_loaded timestamp, reloading prompts...");
                return load_prompts(path).map(Some);
            }
        }
    }
    Ok(None)
}
