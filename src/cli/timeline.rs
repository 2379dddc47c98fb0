use crate::cli::markdown::render_markdown;
use crate::cli::theme::Theme;
use crate::config::ThemeToken;
use ratatui::text::{Line, Span};

const WELCOME: &str = "Ask about flood, heat or storm risk in any South Florida neighborhood. Enter sends, Esc quits.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub(crate) enum TimelineEntry {
    Question(String),
    Answer(AnswerState),
    Notice { kind: NoticeKind, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AnswerState {
    Waiting,
    Streaming(String),
    Done(String),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Timeline {
    entries: Vec<TimelineEntry>,
}

impl Timeline {
    pub(crate) fn push_question(&mut self, text: &str) {
        self.entries.push(TimelineEntry::Question(text.to_string()));
    }

    /// Adds a waiting answer and returns its index for later updates.
    pub(crate) fn push_answer(&mut self) -> usize {
        self.entries.push(TimelineEntry::Answer(AnswerState::Waiting));
        self.entries.len() - 1
    }

    pub(crate) fn push_notice(&mut self, kind: NoticeKind, text: impl Into<String>) {
        self.entries.push(TimelineEntry::Notice {
            kind,
            text: text.into(),
        });
    }

    pub(crate) fn set_answer(&mut self, index: usize, state: AnswerState) {
        if let Some(TimelineEntry::Answer(current)) = self.entries.get_mut(index) {
            *current = state;
        }
    }

    #[cfg(test)]
    pub(crate) fn answer(&self, index: usize) -> Option<&AnswerState> {
        match self.entries.get(index) {
            Some(TimelineEntry::Answer(state)) => Some(state),
            _ => None,
        }
    }

    pub(crate) fn render_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        if self.entries.is_empty() {
            return vec![Line::from(Span::styled(
                WELCOME,
                theme.style(ThemeToken::SystemInfo),
            ))];
        }

        let mut lines = Vec::new();
        for entry in &self.entries {
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            render_entry(entry, theme, &mut lines);
        }
        lines
    }
}

fn render_entry(entry: &TimelineEntry, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    match entry {
        TimelineEntry::Question(text) => {
            for (index, line) in text.lines().enumerate() {
                let label = if index == 0 { "You: " } else { "     " };
                lines.push(Line::from(vec![
                    Span::styled(label, theme.style(ThemeToken::UserLabel)),
                    Span::styled(line.to_string(), theme.style(ThemeToken::UserText)),
                ]));
            }
        }
        TimelineEntry::Answer(state) => {
            lines.push(Line::from(Span::styled(
                "Assistant:",
                theme.style(ThemeToken::AssistantLabel),
            )));
            match state {
                AnswerState::Waiting => lines.push(Line::from(Span::styled(
                    "Thinking...",
                    theme.style(ThemeToken::AssistantWaiting),
                ))),
                AnswerState::Streaming(text) | AnswerState::Done(text) => {
                    lines.extend(render_markdown(text, theme));
                }
                AnswerState::Failed(text) => lines.push(Line::from(Span::styled(
                    text.clone(),
                    theme.style(ThemeToken::SystemError),
                ))),
            }
        }
        TimelineEntry::Notice { kind, text } => {
            let token = match kind {
                NoticeKind::Info => ThemeToken::SystemInfo,
                NoticeKind::Error => ThemeToken::SystemError,
            };
            lines.extend(
                text.lines()
                    .map(|line| Line::from(Span::styled(line.to_string(), theme.style(token)))),
            );
        }
    }
}
