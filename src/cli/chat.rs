use anyhow::{Result, bail};
use crossterm::event::{Event, EventStream};
use futures::StreamExt;
use ratatui::DefaultTerminal;
use std::io::{self, Write};
use tokio::sync::mpsc;

use super::app::{ChatApp, KeyOutcome, forward_reply};
use super::theme::Theme;
use crate::config::AppConfig;
use crate::session::map::MapView;
use crate::session::transport::ChatClient;
use crate::session::{ChatSession, TurnOutcome};
use crate::trace::ChatTrace;

/// Interactive terminal chat against a running gateway.
pub async fn run_chat(config: &AppConfig, session_id: String) -> Result<()> {
    let trace = ChatTrace::create(&session_id)?;
    trace.log_system(&format!("connecting to {}", config.server_url));

    let client = ChatClient::new(reqwest::Client::new(), &config.server_url);
    let session = ChatSession::new(session_id, MapView::new(config.map_tile_url.clone()));
    let theme = Theme::from_config(true, &config.theme);
    let mut app = ChatApp::new(session, theme, config.server_url.clone(), Some(trace.clone()));

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &mut app, client).await;
    ratatui::restore();

    trace.log_transcript(&app.session().render_transcript());
    eprintln!("Session trace: {}", trace.path().display());
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    app: &mut ChatApp,
    client: ChatClient,
) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut input = EventStream::new();

    loop {
        terminal.draw(|frame| app.draw(frame))?;

        tokio::select! {
            next = input.next() => match next {
                Some(Ok(Event::Key(key))) => match app.handle_key(key) {
                    KeyOutcome::Quit => return Ok(()),
                    KeyOutcome::Submit(request) => {
                        tokio::spawn(forward_reply(client.clone(), request, tx.clone()));
                    }
                    KeyOutcome::Continue => {}
                },
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
            Some(event) = rx.recv() => app.apply(event),
        }
    }
}

/// One question, answer streamed to stdout. The map link is printed when the
/// gateway resolved a neighborhood.
pub async fn run_ask(config: &AppConfig, session_id: String, question: &str) -> Result<()> {
    let client = ChatClient::new(reqwest::Client::new(), &config.server_url);
    let mut session = ChatSession::new(session_id, MapView::new(config.map_tile_url.clone()));

    let mut stdout = io::stdout().lock();
    let outcome = session
        .exchange(&client, question, |text| {
            let _ = stdout.write_all(text.as_bytes());
            let _ = stdout.flush();
        })
        .await?;

    match outcome {
        TurnOutcome::Answered { location } => {
            writeln!(stdout)?;
            if location.is_some() {
                writeln!(stdout, "\nMap: {}", session.map().osm_link())?;
            }
            Ok(())
        }
        TurnOutcome::Failed(err) => {
            if let Some(message) = session.history().last() {
                writeln!(stdout, "{}", message.content)?;
            }
            bail!("chat request to {} failed: {err}", client.endpoint())
        }
    }
}
