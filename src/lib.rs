pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod logging;
pub mod matcher;
pub mod neighborhood;
pub mod prompt;
pub mod protocol;
pub mod server;
pub mod session;
pub mod trace;

use anyhow::Result;
use cli::{AskArgs, CliArgs, ClientArgs, Command, ServeArgs};
use config::AppConfig;
use http::client::HttpClient;
use http::debug::HttpDebugConfig;
use llm::groq::GroqProvider;
use server::AppState;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::warn;

pub async fn run(args: CliArgs) -> Result<()> {
    let mut config = AppConfig::load_with_path(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Chat(ClientArgs::default())) {
        Command::Serve(serve_args) => {
            apply_serve_overrides(&mut config, serve_args);
            logging::init(&config.log_level)?;
            serve(config).await
        }
        Command::Chat(client_args) => {
            apply_client_overrides(&mut config, client_args);
            cli::run_chat(&config, generate_session_id()).await
        }
        Command::Ask(AskArgs { client, question }) => {
            apply_client_overrides(&mut config, client);
            logging::init(&config.log_level)?;
            cli::run_ask(&config, generate_session_id(), &question.join(" ")).await
        }
    }
}

async fn serve(config: AppConfig) -> Result<()> {
    let http = HttpClient::new(
        reqwest::Client::new(),
        HttpDebugConfig::from_flag(config.http_debug),
    );
    let llm = match GroqProvider::new(
        http,
        config.groq_api_key.clone(),
        config.groq_model.clone(),
        config.groq_base_url.clone(),
    ) {
        Ok(provider) => Some(Arc::new(provider)),
        Err(err) => {
            warn!(error = %err, "chat requests will fail until GROQ_API_KEY is configured");
            None
        }
    };

    let state = AppState {
        llm,
        dataset_path: Arc::new(config.dataset_path.clone()),
        profile: config.prompt_profile,
        mode: config.response_mode,
    };
    server::serve(&config.bind_addr, state).await
}

fn apply_serve_overrides(config: &mut AppConfig, args: ServeArgs) {
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if let Some(mode) = args.mode {
        config.response_mode = mode;
    }
    if let Some(dataset) = args.dataset {
        config.dataset_path = dataset;
    }
    if let Some(profile) = args.profile {
        config.prompt_profile = profile;
    }
}

fn apply_client_overrides(config: &mut AppConfig, args: ClientArgs) {
    if let Some(server) = args.server {
        config.server_url = server;
    }
}

fn generate_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis());
    format!("{millis:x}-{:x}", std::process::id())
}
