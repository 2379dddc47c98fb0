pub mod app;
mod args;
mod chat;
mod markdown;
pub mod theme;
mod timeline;

pub use args::{AskArgs, ClientArgs, CliArgs, Command, ServeArgs};
pub use chat::{run_ask, run_chat};
