use anyhow::Result;
use climate_chat::cli::app::{ChatApp, ChatEvent, KeyOutcome, Regions};
use climate_chat::cli::theme::Theme;
use climate_chat::session::ChatSession;
use climate_chat::session::map::MapView;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

pub const SERVER_URL: &str = "http://127.0.0.1:3000";

pub struct UiHarness {
    pub app: ChatApp,
    terminal: Terminal<TestBackend>,
}

impl UiHarness {
    pub fn render(&mut self) -> Result<()> {
        self.terminal.draw(|frame| self.app.draw(frame))?;
        Ok(())
    }

    pub fn send_key(&mut self, key: KeyEvent) -> Result<KeyOutcome> {
        let outcome = self.app.handle_key(key);
        self.render()?;
        Ok(outcome)
    }

    pub fn apply(&mut self, event: ChatEvent) -> Result<()> {
        self.app.apply(event);
        self.render()
    }

    pub fn regions(&self) -> Result<Regions> {
        let size = self.terminal.size()?;
        Ok(self.app.regions(Rect::new(0, 0, size.width, size.height)))
    }

    pub fn buffer_lines(&self) -> Vec<String> {
        let buffer = self.terminal.backend().buffer();
        let area = buffer.area;
        (0..area.height)
            .map(|y| {
                (0..area.width)
                    .map(|x| buffer[(x, y)].symbol())
                    .collect::<String>()
            })
            .collect()
    }

    pub fn line(&self, row: u16) -> Option<String> {
        self.buffer_lines().into_iter().nth(usize::from(row))
    }
}

pub fn new_harness(session_id: &str, width: u16, height: u16) -> Result<UiHarness> {
    let session = ChatSession::new(session_id, MapView::default());
    let app = ChatApp::new(session, Theme::new(false), SERVER_URL, None);
    let terminal = Terminal::new(TestBackend::new(width, height))?;
    let mut harness = UiHarness { app, terminal };
    harness.render()?;
    Ok(harness)
}

pub fn type_text(harness: &mut UiHarness, text: &str) -> Result<()> {
    for ch in text.chars() {
        harness.send_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE))?;
    }
    Ok(())
}

pub fn submit_line(harness: &mut UiHarness, line: &str) -> Result<KeyOutcome> {
    type_text(harness, line)?;
    harness.send_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE))
}

pub fn press_ctrl_j(harness: &mut UiHarness) -> Result<()> {
    harness.send_key(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL))?;
    Ok(())
}

pub fn normalized_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn region_text(harness: &UiHarness, area: Rect) -> String {
    let lines = harness.buffer_lines();
    let start_row = usize::from(area.y);
    let end_row = start_row.saturating_add(usize::from(area.height));

    let mut rendered = Vec::new();
    for line in lines.iter().take(end_row.min(lines.len())).skip(start_row) {
        let clipped = line
            .chars()
            .skip(usize::from(area.x))
            .take(usize::from(area.width))
            .collect::<String>();
        rendered.push(clipped);
    }

    normalized_text(&rendered.join("\n"))
}

pub fn timeline_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.timeline))
}

pub fn map_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.map))
}

pub fn input_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.input))
}

pub fn status_snapshot(harness: &UiHarness) -> Result<String> {
    let regions = harness.regions()?;
    Ok(region_text(harness, regions.status))
}
