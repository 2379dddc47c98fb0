//! Renders assistant replies, which are Markdown, into styled terminal lines.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use super::theme::Theme;
use crate::config::ThemeToken;

pub(crate) fn render_markdown(text: &str, theme: &Theme) -> Vec<Line<'static>> {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_MATH;
    let mut writer = LineWriter::new(theme);
    for event in Parser::new_ext(text, options) {
        writer.event(event);
    }
    writer.finish()
}

struct LineWriter<'t> {
    theme: &'t Theme,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    pending_marker: Option<String>,
    quote_depth: usize,
    code_block: bool,
    link: Option<String>,
    table: Option<TableBuffer>,
}

#[derive(Default)]
struct TableBuffer {
    rows: Vec<Vec<String>>,
    cell: String,
    header_rows: usize,
}

impl<'t> LineWriter<'t> {
    fn new(theme: &'t Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current: Vec::new(),
            styles: vec![theme.style(ThemeToken::AssistantText)],
            lists: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            code_block: false,
            link: None,
            table: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.styled(&code, self.theme.style(ThemeToken::Code)),
            Event::InlineMath(math) => self.styled(&math, self.theme.style(ThemeToken::Code)),
            Event::DisplayMath(math) => {
                self.flush();
                self.styled(&math, self.theme.style(ThemeToken::Code));
                self.flush();
            }
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(24),
                    self.theme.style(ThemeToken::Quote),
                )));
                self.blank();
            }
            Event::TaskListMarker(done) => self.text(if done { "[x] " } else { "[ ] " }),
            Event::Html(html) | Event::InlineHtml(html) => self.text(&html),
            Event::FootnoteReference(name) => self.text(&format!("[{name}]")),
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                let mut style = self.theme.style(ThemeToken::Heading);
                if level == HeadingLevel::H1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.styles.push(style);
            }
            Tag::BlockQuote(_) => {
                self.flush();
                self.quote_depth += 1;
                self.styles.push(self.theme.style(ThemeToken::Quote));
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.lines.push(Line::from(Span::styled(
                            format!("  [{lang}]"),
                            self.theme.style(ThemeToken::Quote),
                        )));
                    }
                }
                self.styles.push(self.theme.style(ThemeToken::Code));
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                self.pending_marker = Some(marker);
            }
            Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
            Tag::Strong => self.push_modifier(Modifier::BOLD),
            Tag::Strikethrough => self.push_modifier(Modifier::CROSSED_OUT),
            Tag::Link { dest_url, .. } => {
                self.link = Some(dest_url.into_string());
                self.styles.push(self.theme.style(ThemeToken::Link));
            }
            Tag::Table(_) => {
                self.flush();
                self.table = Some(TableBuffer::default());
            }
            Tag::TableRow | Tag::TableHead => {
                if let Some(table) = &mut self.table {
                    table.rows.push(Vec::new());
                }
            }
            Tag::TableCell => {
                if let Some(table) = &mut self.table {
                    table.cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.flush();
                self.styles.pop();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush();
                self.styles.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.flush();
                self.code_block = false;
                self.styles.pop();
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.link.take() {
                    self.styled(&format!(" ({url})"), self.theme.style(ThemeToken::Quote));
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = &mut self.table {
                    let cell = std::mem::take(&mut table.cell);
                    if let Some(row) = table.rows.last_mut() {
                        row.push(cell.trim().to_string());
                    }
                }
            }
            TagEnd::TableHead => {
                if let Some(table) = &mut self.table {
                    table.header_rows = table.rows.len();
                }
            }
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    self.table_lines(table);
                }
                self.blank();
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        let style = self.style();
        self.styled(text, style);
    }

    fn styled(&mut self, text: &str, style: Style) {
        if let Some(table) = &mut self.table {
            table.cell.push_str(text);
            return;
        }

        if self.code_block {
            for (index, line) in text.split('\n').enumerate() {
                if index > 0 {
                    self.flush();
                }
                if !line.is_empty() {
                    self.current.push(Span::styled(format!("  {line}"), style));
                }
            }
            return;
        }

        if let Some(marker) = self.pending_marker.take() {
            let indent = "  ".repeat(self.lists.len().saturating_sub(1));
            self.current.push(Span::styled(
                format!("{indent}{marker}"),
                self.theme.style(ThemeToken::AssistantLabel),
            ));
        }
        self.current.push(Span::styled(text.to_string(), style));
    }

    fn table_lines(&mut self, table: TableBuffer) {
        let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
        let mut widths = vec![0; columns];
        for row in &table.rows {
            for (index, cell) in row.iter().enumerate() {
                widths[index] = widths[index].max(cell.chars().count());
            }
        }

        let text_style = self.theme.style(ThemeToken::AssistantText);
        for (row_index, row) in table.rows.iter().enumerate() {
            let cells = widths
                .iter()
                .enumerate()
                .map(|(index, &width)| {
                    let cell = row.get(index).map(String::as_str).unwrap_or("");
                    format!("{cell:<width$}")
                })
                .collect::<Vec<_>>();
            let style = if row_index < table.header_rows {
                text_style.add_modifier(Modifier::BOLD)
            } else {
                text_style
            };
            self.lines
                .push(Line::from(Span::styled(cells.join(" │ ").trim_end().to_string(), style)));

            if row_index + 1 == table.header_rows {
                let rule = widths
                    .iter()
                    .map(|&width| "─".repeat(width))
                    .collect::<Vec<_>>()
                    .join("─┼─");
                self.lines
                    .push(Line::from(Span::styled(rule, self.theme.style(ThemeToken::Quote))));
            }
        }
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.style().add_modifier(modifier);
        self.styles.push(style);
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or_default()
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.current.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                self.theme.style(ThemeToken::Quote),
            ));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|line| line.spans.is_empty()) || self.lines.is_empty() {
            return;
        }
        self.lines.push(Line::default());
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|line| line.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::render_markdown;
    use crate::cli::theme::Theme;
    use crate::config::ThemeToken;
    use ratatui::style::Modifier;

    fn plain(text: &str) -> String {
        render_markdown(text, &Theme::new(false))
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_blocks_with_blank_separators() {
        let text = "## Flood risk\n\nBrickell sees **king tides** and `storm surge`.\n\n- elevate\n- insure\n\n1. plan\n2. act";
        insta::assert_snapshot!(plain(text), @r"
        Flood risk

        Brickell sees king tides and storm surge.

        • elevate
        • insure

        1. plan
        2. act
        ");
    }

    #[test]
    fn nested_lists_are_indented() {
        assert_eq!(plain("- outer\n  - inner"), "• outer\n  • inner");
    }

    #[test]
    fn links_show_their_destination() {
        assert_eq!(
            plain("See [FEMA](https://fema.gov) maps."),
            "See FEMA (https://fema.gov) maps."
        );
    }

    #[test]
    fn code_blocks_are_indented_per_line() {
        assert_eq!(
            plain("```toml\nzone = \"AE\"\nbfe = 9\n```"),
            "  [toml]\n  zone = \"AE\"\n  bfe = 9"
        );
    }

    #[test]
    fn block_quotes_get_a_gutter() {
        assert_eq!(plain("> Sea level rise\n> accelerates"), "│ Sea level rise accelerates");
    }

    #[test]
    fn tables_align_columns() {
        let text = "| Area | Risk |\n|---|---|\n| Brickell | High |\n| Hialeah | Moderate |";
        assert_eq!(
            plain(text),
            "Area     │ Risk\n─────────┼─────────\nBrickell │ High\nHialeah  │ Moderate"
        );
    }

    #[test]
    fn math_is_kept_verbatim() {
        assert_eq!(plain("Rise of $0.3m$ by 2040"), "Rise of 0.3m by 2040");
    }

    #[test]
    fn emphasis_styles_stack() {
        let theme = Theme::new(true);
        let lines = render_markdown("***both***", &theme);
        let style = lines[0].spans[0].style;
        assert!(style.add_modifier.contains(Modifier::BOLD | Modifier::ITALIC));
        assert_eq!(style.fg, theme.style(ThemeToken::AssistantText).fg);
    }
}
