use clap::{ Parser, Subcommand };

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    // --- Completion Endpoint Args ---
    /// URL the chat view posts the message history to.
    #[arg(long, global = true, env = "COMPLETION_URL", default_value = "http://127.0.0.1:3000/api/chat")]
    pub completion_url: String,

    // --- History Store Args ---
    /// History chat store type (supabase, redis, memory)
    #[arg(long, global = true, env = "HISTORY_TYPE", default_value = "supabase")]
    pub history_type: String,

    /// History store endpoint (project URL for supabase, e.g. redis://127.0.0.1:6379 for redis)
    #[arg(long, global = true, env = "HISTORY_HOST", default_value = "http://127.0.0.1:54321")]
    pub history_host: String,

    /// API key for the history store (supabase anon or service key).
    #[arg(long, global = true, env = "HISTORY_API_KEY", default_value = "", hide_env_values = true)]
    pub history_api_key: String,

    /// Prefix for Redis history keys.
    #[arg(long, global = true, env = "HISTORY_REDIS_PREFIX", default_value = "chatbot:")]
    pub history_redis_prefix: String,

    // --- General App Args ---
    /// Path to the prompt configuration file. Built-in prompts are used if it does not exist.
    #[arg(long, global = true, env = "PROMPTS_PATH", default_value = "prompts.json")]
    pub prompts_path: String,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Chat with the assistant (default).
    Chat {
        /// Continue a stored conversation instead of starting a new one.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Browse stored conversations.
    History {
        /// Show the messages of this conversation.
        #[arg(long)]
        conversation: Option<String>,
    },
    /// Serve the completion endpoint, relaying to an LLM provider.
    Serve(ServeArgs),
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct ServeArgs {
    /// Host address and port for the server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:3000")]
    pub server_addr: String,

    /// Type of LLM provider for chat completion (openai, ollama)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "openai")]
    pub chat_llm_type: String,

    /// Base URL for the Chat LLM provider API (e.g., http://localhost:11434 for Ollama)
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let adapters handle defaults if None
    pub chat_base_url: Option<String>,

    /// API Key for the Chat LLM provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "", hide_env_values = true)]
    pub chat_api_key: String,

    /// Model name for chat completion (e.g., gpt-3.5-turbo, llama3)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on adapter defaults if None
    pub chat_model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_chat() {
        let args = Args::parse_from(["chatbot-ui"]);
        assert!(args.command.is_none());
        assert_eq!(args.history_type, "supabase");
        assert_eq!(args.completion_url, "http://127.0.0.1:3000/api/chat");
    }

    #[test]
    fn global_options_follow_subcommand() {
        let args = Args::parse_from([
            "chatbot-ui",
            "history",
            "--conversation",
            "c1",
            "--history-type",
            "memory",
        ]);
        assert_eq!(args.command, Some(Command::History { conversation: Some("c1".into()) }));
        assert_eq!(args.history_type, "memory");
    }

    #[test]
    fn serve_options() {
        let args = Args::parse_from([
            "chatbot-ui",
            "serve",
            "--chat-llm-type",
            "ollama",
            "--server-addr",
            "0.0.0.0:8080",
        ]);
        match args.command {
            Some(Command::Serve(serve)) => {
                assert_eq!(serve.chat_llm_type, "ollama");
                assert_eq!(serve.server_addr, "0.0.0.0:8080");
                assert!(serve.chat_model.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
