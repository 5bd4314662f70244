pub mod prompt;

pub use prompt::{ PromptConfig, PromptError };
