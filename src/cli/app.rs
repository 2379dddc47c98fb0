use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tokio::sync::mpsc::UnboundedSender;

use crate::cli::theme::Theme;
use crate::cli::timeline::{AnswerState, NoticeKind, Timeline};
use crate::config::ThemeToken;
use crate::neighborhood::LocationHint;
use crate::protocol::{APOLOGY, ChatEnvelope, ChatRequest};
use crate::session::transport::{ChatClient, Reply, TransportError};
use crate::session::{ChatSession, SessionError};
use crate::trace::ChatTrace;

const SCROLL_STEP: u16 = 5;
const MAX_INPUT_ROWS: u16 = 6;

/// Progress of the reply to the turn in flight, as seen by the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Chunk(String),
    Envelope(ChatEnvelope),
    Done,
    Failed(TransportError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    Continue,
    Submit(ChatRequest),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Regions {
    pub timeline: Rect,
    pub map: Rect,
    pub input: Rect,
    pub status: Rect,
}

pub struct ChatApp {
    session: ChatSession,
    timeline: Timeline,
    answer: Option<usize>,
    input: String,
    scroll: u16,
    theme: Theme,
    server_url: String,
    trace: Option<ChatTrace>,
}

impl ChatApp {
    pub fn new(
        session: ChatSession,
        theme: Theme,
        server_url: impl Into<String>,
        trace: Option<ChatTrace>,
    ) -> Self {
        Self {
            session,
            timeline: Timeline::default(),
            answer: None,
            input: String::new(),
            scroll: 0,
            theme,
            server_url: server_url.into(),
            trace,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.kind != KeyEventKind::Press {
            return KeyOutcome::Continue;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return KeyOutcome::Quit,
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return KeyOutcome::Quit,
            KeyCode::Char('j') if ctrl => self.input.push('\n'),
            KeyCode::Enter => return self.submit(),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_add(SCROLL_STEP),
            KeyCode::PageDown => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            KeyCode::Char(ch) if !ctrl => self.input.push(ch),
            _ => {}
        }
        KeyOutcome::Continue
    }

    fn submit(&mut self) -> KeyOutcome {
        match self.session.begin_turn(&self.input) {
            Ok(request) => {
                self.timeline.push_question(&request.message);
                self.answer = Some(self.timeline.push_answer());
                if let Some(trace) = &self.trace {
                    trace.log_user(&request.message);
                }
                self.input.clear();
                self.scroll = 0;
                KeyOutcome::Submit(request)
            }
            Err(SessionError::Busy) => {
                self.timeline.push_notice(
                    NoticeKind::Info,
                    "Still waiting for the previous reply; your message is kept below.",
                );
                KeyOutcome::Continue
            }
            Err(_) => KeyOutcome::Continue,
        }
    }

    pub fn apply(&mut self, event: ChatEvent) {
        let Some(index) = self.answer else {
            return;
        };

        match event {
            ChatEvent::Chunk(text) => {
                if self.session.append_chunk(&text).is_ok() {
                    let visible = self.session.visible_reply().to_string();
                    self.timeline.set_answer(index, AnswerState::Streaming(visible));
                }
            }
            ChatEvent::Envelope(envelope) => {
                let closed = self.session.apply_envelope(envelope);
                self.complete(index, closed);
            }
            ChatEvent::Done => {
                let closed = self.session.finish_turn();
                self.complete(index, closed);
            }
            ChatEvent::Failed(err) => {
                if self.session.fail_turn().is_err() {
                    return;
                }
                self.answer = None;
                self.timeline
                    .set_answer(index, AnswerState::Failed(APOLOGY.to_string()));
                self.timeline.push_notice(NoticeKind::Error, err.to_string());
                if let Some(trace) = &self.trace {
                    trace.log_error(&err.to_string());
                }
            }
        }
    }

    fn complete(&mut self, index: usize, closed: Result<Option<LocationHint>, SessionError>) {
        let Ok(location) = closed else {
            return;
        };
        self.answer = None;

        let reply = self
            .session
            .history()
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default();
        if let Some(trace) = &self.trace {
            trace.log_assistant(&reply);
            if let Some(location) = location {
                trace.log_location(location);
            }
        }
        self.timeline.set_answer(index, AnswerState::Done(reply));
    }

    pub fn regions(&self, area: Rect) -> Regions {
        let input_rows = (self.input.split('\n').count() as u16).clamp(1, MAX_INPUT_ROWS);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(input_rows + 2),
                Constraint::Length(1),
            ])
            .split(area);
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(66), Constraint::Percentage(34)])
            .split(rows[0]);

        Regions {
            timeline: top[0],
            map: top[1],
            input: rows[1],
            status: rows[2],
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        let regions = self.regions(frame.area());
        self.draw_timeline(frame, regions.timeline);
        self.draw_map(frame, regions.map);
        self.draw_input(frame, regions.input);
        self.draw_status(frame, regions.status);
    }

    fn draw_timeline(&self, frame: &mut Frame, area: Rect) {
        let paragraph =
            Paragraph::new(self.timeline.render_lines(&self.theme)).wrap(Wrap { trim: false });
        let total = u16::try_from(paragraph.line_count(area.width)).unwrap_or(u16::MAX);
        let bottom = total.saturating_sub(area.height);
        let offset = bottom.saturating_sub(self.scroll);
        frame.render_widget(paragraph.scroll((offset, 0)), area);
    }

    fn draw_map(&self, frame: &mut Frame, area: Rect) {
        let map = self.session.map();
        let info = self.theme.style(ThemeToken::SystemInfo);
        let center = map.center();
        let tile = map.tile();

        let mut lines = vec![
            Line::from(Span::styled(
                format!("Center {:.4}, {:.4}", center.lat, center.lon),
                info,
            )),
            Line::from(Span::styled(
                format!("Zoom {} · tile {}/{}/{}", map.zoom(), tile.z, tile.x, tile.y),
                info,
            )),
            Line::default(),
        ];
        match map.marker() {
            Some(marker) => {
                lines.push(Line::from(Span::styled(
                    format!("◉ {}", marker.label),
                    self.theme.style(ThemeToken::MapMarker),
                )));
                lines.push(Line::from(Span::styled(
                    format!("  {:.4}, {:.4}", marker.location.lat, marker.location.lon),
                    info,
                )));
            }
            None => lines.push(Line::from(Span::styled("No neighborhood selected", info))),
        }
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            map.osm_link(),
            self.theme.style(ThemeToken::Link),
        )));
        lines.push(Line::from(Span::styled(map.tile_url(), info)));

        let block = Block::default().borders(Borders::LEFT).title(" Map ");
        frame.render_widget(
            Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
            area,
        );
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let style = self.theme.style(ThemeToken::InputBlock);
        let lines: Vec<Line> = if self.input.is_empty() {
            vec![Line::default()]
        } else {
            self.input.split('\n').map(Line::raw).collect()
        };
        let visible = area.height.saturating_sub(2);
        let skip = (lines.len() as u16).saturating_sub(visible);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Message ")
            .style(style);
        frame.render_widget(
            Paragraph::new(lines.clone()).block(block).scroll((skip, 0)),
            area,
        );

        let last = lines.last().map_or(0, Line::width) as u16;
        let row = (lines.len() as u16).saturating_sub(skip).max(1);
        frame.set_cursor_position(Position::new(
            area.x + 1 + last.min(area.width.saturating_sub(3)),
            area.y + row,
        ));
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let state = if self.session.is_in_flight() {
            "Waiting for reply..."
        } else {
            "Ready"
        };
        let text = format!(
            "Climate Chat | Session: {} | Server: {} | {state}",
            self.session.session_id(),
            self.server_url
        );
        frame.render_widget(
            Paragraph::new(Span::styled(text, self.theme.style(ThemeToken::Status))),
            area,
        );
    }
}

/// Sends one request and reports its progress as [`ChatEvent`]s. Runs on a
/// spawned task so the UI keeps drawing while the reply streams in.
pub async fn forward_reply(
    client: ChatClient,
    request: ChatRequest,
    events: UnboundedSender<ChatEvent>,
) {
    let mut chunks = match client.send(&request).await {
        Ok(Reply::Envelope(envelope)) => {
            let _ = events.send(ChatEvent::Envelope(envelope));
            return;
        }
        Ok(Reply::Stream(chunks)) => chunks,
        Err(err) => {
            let _ = events.send(ChatEvent::Failed(err));
            return;
        }
    };

    while let Some(chunk) = chunks.next().await {
        let event = match chunk {
            Ok(text) => ChatEvent::Chunk(text),
            Err(err) => {
                let _ = events.send(ChatEvent::Failed(err));
                return;
            }
        };
        if events.send(event).is_err() {
            return;
        }
    }
    let _ = events.send(ChatEvent::Done);
}
