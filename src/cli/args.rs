use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::prompt::PromptProfile;
use crate::server::relay::ResponseMode;

#[derive(Debug, Parser, Clone, PartialEq)]
#[command(name = "climate-chat", version)]
#[command(
    about = "Neighborhood-aware climate risk chat for South Florida",
    long_about = "Neighborhood-aware climate risk chat for South Florida\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/climate-chat/config.toml\n    2. ~/.config/climate-chat/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum Command {
    /// Run the chat gateway (`POST /api/chat`).
    Serve(ServeArgs),
    /// Open the interactive terminal chat (default).
    Chat(ClientArgs),
    /// Ask a single question and print the streamed answer.
    Ask(AskArgs),
}

#[derive(Debug, Args, Clone, PartialEq, Default)]
pub struct ServeArgs {
    /// Address to listen on, e.g. 127.0.0.1:3000.
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// How completions are returned: streaming or buffered.
    #[arg(long, value_name = "MODE")]
    pub mode: Option<ResponseMode>,

    /// Neighborhood dataset (JSON array).
    #[arg(long, value_name = "PATH")]
    pub dataset: Option<PathBuf>,

    /// System prompt variant: neighborhood or regional.
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<PromptProfile>,
}

#[derive(Debug, Args, Clone, PartialEq, Default)]
pub struct ClientArgs {
    /// Base URL of the chat gateway.
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,
}

#[derive(Debug, Args, Clone, PartialEq)]
pub struct AskArgs {
    #[command(flatten)]
    pub client: ClientArgs,

    /// The question; multiple words are joined with spaces.
    #[arg(required = true, value_name = "QUESTION")]
    pub question: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{CliArgs, Command};
    use crate::prompt::PromptProfile;
    use crate::server::relay::ResponseMode;
    use clap::Parser;
    use std::path::Path;

    #[test]
    fn parse_defaults() {
        let args = CliArgs::try_parse_from(["climate-chat"]).expect("should parse");
        assert_eq!(args.config, None);
        assert_eq!(args.command, None);
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::try_parse_from([
            "climate-chat",
            "serve",
            "--bind",
            "0.0.0.0:8080",
            "--mode",
            "buffered",
            "--profile",
            "regional",
            "--config",
            "/tmp/custom.toml",
        ])
        .expect("parse");

        assert_eq!(args.config.as_deref(), Some(Path::new("/tmp/custom.toml")));
        let Some(Command::Serve(serve)) = args.command else {
            panic!("expected serve");
        };
        assert_eq!(serve.bind.as_deref(), Some("0.0.0.0:8080"));
        assert_eq!(serve.mode, Some(ResponseMode::Buffered));
        assert_eq!(serve.profile, Some(PromptProfile::Regional));
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        assert!(CliArgs::try_parse_from(["climate-chat", "serve", "--mode", "sse"]).is_err());
    }

    #[test]
    fn parse_ask_joins_words() {
        let args = CliArgs::try_parse_from([
            "climate-chat",
            "ask",
            "--server",
            "http://gw:3000",
            "flooding",
            "in",
            "Brickell?",
        ])
        .expect("parse");

        let Some(Command::Ask(ask)) = args.command else {
            panic!("expected ask");
        };
        assert_eq!(ask.client.server.as_deref(), Some("http://gw:3000"));
        assert_eq!(ask.question.join(" "), "flooding in Brickell?");
    }

    #[test]
    fn parse_ask_requires_question() {
        assert!(CliArgs::try_parse_from(["climate-chat", "ask"]).is_err());
    }
}
