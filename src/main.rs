use chatbot_ui::cli::{ Args, Command };
use clap::Parser;
use dotenv::dotenv;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();

    // interactive views log warnings only unless RUST_LOG says otherwise
    let default_filter = match args.command {
        Some(Command::Serve(_)) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    chatbot_ui::run(args).await
}
