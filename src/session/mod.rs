//! Client-side conversation state: history, the pending reply, and the map
//! that follows the neighborhoods the gateway resolves.

pub mod map;
pub mod transport;

use futures::StreamExt;
use thiserror::Error;

use crate::neighborhood::LocationHint;
use crate::protocol::{
    APOLOGY, ChatEnvelope, ChatMessage, ChatRequest, Role, SENTINEL_PREFIX, extract_sentinel,
};
use map::MapView;
use transport::{ChatClient, Reply, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("message is empty")]
    EmptyMessage,
    #[error("still waiting for the previous reply")]
    Busy,
    #[error("no reply is pending")]
    Idle,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Answered { location: Option<LocationHint> },
    Failed(TransportError),
}

#[derive(Debug, Clone)]
pub struct ChatSession {
    session_id: String,
    history: Vec<ChatMessage>,
    map: MapView,
    in_flight: bool,
}

impl ChatSession {
    pub fn new(session_id: impl Into<String>, map: MapView) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
            map,
            in_flight: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Records the user turn plus an empty assistant placeholder and returns
    /// the request to send. The request carries only the turns before this one.
    pub fn begin_turn(&mut self, text: &str) -> Result<ChatRequest, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        if self.in_flight {
            return Err(SessionError::Busy);
        }

        let request = ChatRequest {
            message: text.to_string(),
            session_id: self.session_id.clone(),
            history: self.history.clone(),
        };
        self.history.push(ChatMessage::new(Role::User, text));
        self.history.push(ChatMessage::new(Role::Assistant, ""));
        self.in_flight = true;
        Ok(request)
    }

    pub fn append_chunk(&mut self, text: &str) -> Result<(), SessionError> {
        self.placeholder()?.content.push_str(text);
        Ok(())
    }

    /// Reply text accumulated so far, minus a trailing line that may still
    /// turn into the sentinel.
    pub fn visible_reply(&self) -> &str {
        let Some(message) = self.pending_message() else {
            return "";
        };
        let text = message.content.as_str();
        let body = text.trim_end_matches('\n');
        let line_start = body.rfind('\n').map_or(0, |index| index + 1);
        let last_line = &body[line_start..];
        if last_line.starts_with(SENTINEL_PREFIX) || SENTINEL_PREFIX.starts_with(last_line) {
            &text[..line_start]
        } else {
            text
        }
    }

    /// Closes a streamed turn. When the text ends with a valid sentinel line
    /// the placeholder becomes its `response` and the map follows its
    /// location; otherwise the raw text is kept as the reply.
    pub fn finish_turn(&mut self) -> Result<Option<LocationHint>, SessionError> {
        let message = self.placeholder()?;
        let parsed = extract_sentinel(&message.content)
            .map(|(before, envelope)| (before.to_string(), envelope));

        let location = match parsed {
            Some((before, envelope)) => {
                let response = envelope.parsed.response;
                message.content = if response.trim().is_empty() {
                    before
                } else {
                    response
                };
                envelope.parsed.location
            }
            None => {
                message.content = message.content.trim_end().to_string();
                None
            }
        };

        self.close_turn(location);
        Ok(location)
    }

    pub fn apply_envelope(
        &mut self,
        envelope: ChatEnvelope,
    ) -> Result<Option<LocationHint>, SessionError> {
        let message = self.placeholder()?;
        message.content = envelope.parsed.response;
        let location = envelope.parsed.location;
        self.close_turn(location);
        Ok(location)
    }

    pub fn fail_turn(&mut self) -> Result<(), SessionError> {
        self.placeholder()?.content = APOLOGY.to_string();
        self.in_flight = false;
        Ok(())
    }

    pub fn render_transcript(&self) -> String {
        self.history
            .iter()
            .map(|message| format!("{}: {}", role_label(message.role), message.content))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Runs one full turn against the gateway. `on_chunk` sees reply text as
    /// it becomes displayable; the sentinel line is never passed to it.
    pub async fn exchange<F>(
        &mut self,
        client: &ChatClient,
        text: &str,
        mut on_chunk: F,
    ) -> Result<TurnOutcome, SessionError>
    where
        F: FnMut(&str),
    {
        let request = self.begin_turn(text)?;

        let mut chunks = match client.send(&request).await {
            Ok(Reply::Envelope(envelope)) => {
                let location = self.apply_envelope(envelope)?;
                if let Some(message) = self.history.last() {
                    on_chunk(&message.content);
                }
                return Ok(TurnOutcome::Answered { location });
            }
            Ok(Reply::Stream(chunks)) => chunks,
            Err(err) => {
                self.fail_turn()?;
                return Ok(TurnOutcome::Failed(err));
            }
        };

        let mut shown = 0;
        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(text) => {
                    self.append_chunk(&text)?;
                    let visible = self.visible_reply();
                    if visible.len() > shown {
                        on_chunk(&visible[shown..]);
                        shown = visible.len();
                    }
                }
                Err(err) => {
                    self.fail_turn()?;
                    return Ok(TurnOutcome::Failed(err));
                }
            }
        }

        let has_sentinel = self
            .pending_message()
            .is_some_and(|message| extract_sentinel(&message.content).is_some());
        let location = self.finish_turn()?;
        if !has_sentinel {
            // The held-back tail turned out to be ordinary reply text.
            if let Some(rest) = self.history.last().and_then(|m| m.content.get(shown..)) {
                if !rest.is_empty() {
                    on_chunk(rest);
                }
            }
        }
        Ok(TurnOutcome::Answered { location })
    }

    fn pending_message(&self) -> Option<&ChatMessage> {
        if !self.in_flight {
            return None;
        }
        self.history.last()
    }

    fn placeholder(&mut self) -> Result<&mut ChatMessage, SessionError> {
        if !self.in_flight {
            return Err(SessionError::Idle);
        }
        self.history.last_mut().ok_or(SessionError::Idle)
    }

    fn close_turn(&mut self, location: Option<LocationHint>) {
        self.in_flight = false;
        if let Some(location) = location {
            let label = self.last_question().unwrap_or("Matched area").to_string();
            self.map.focus(location, label);
        }
    }

    fn last_question(&self) -> Option<&str> {
        self.history
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "You",
        Role::Assistant => "Assistant",
        Role::System => "System",
    }
}
