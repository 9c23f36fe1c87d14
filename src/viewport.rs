use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::text::{Line, Text};
use unicode_width::UnicodeWidthChar;

/// Line-oriented scroll view over a fixed block of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogViewport {
    width: u16,
    height: u16,
    lines: Vec<String>,
    offset: usize,
}

impl LogViewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            lines: Vec::new(),
            offset: 0,
        }
    }

    pub fn set_content(&mut self, content: &str) {
        self.lines = content.lines().map(str::to_string).collect();
        self.offset = self.offset.min(self.max_offset());
    }

    #[cfg(test)]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[cfg(test)]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[cfg(test)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns true when the event changed what is on screen.
    pub fn handle(&mut self, event: &Event) -> bool {
        let before = (self.offset, self.width, self.height);
        match event {
            Event::Resize(width, height) => {
                self.width = (*width).max(1);
                self.height = (*height).max(1);
                self.offset = self.offset.min(self.max_offset());
            }
            Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(*key),
            _ => {}
        }
        before != (self.offset, self.width, self.height)
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let page = self.height as isize;
        let half_page = (page / 2).max(1);
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.scroll(-1),
            KeyCode::Down | KeyCode::Char('j') => self.scroll(1),
            KeyCode::PageUp | KeyCode::Char('b') => self.scroll(-page),
            KeyCode::PageDown | KeyCode::Char('f') | KeyCode::Char(' ') => self.scroll(page),
            KeyCode::Char('u') if ctrl || key.modifiers.is_empty() => self.scroll(-half_page),
            KeyCode::Char('d') if ctrl || key.modifiers.is_empty() => self.scroll(half_page),
            KeyCode::Home | KeyCode::Char('g') => self.offset = 0,
            KeyCode::End | KeyCode::Char('G') => self.offset = self.max_offset(),
            _ => {}
        }
    }

    fn scroll(&mut self, delta: isize) {
        let max = self.max_offset() as isize;
        self.offset = (self.offset as isize + delta).clamp(0, max) as usize;
    }

    fn max_offset(&self) -> usize {
        self.lines.len().saturating_sub(self.height as usize)
    }

    pub fn scroll_percent(&self) -> u16 {
        let max = self.max_offset();
        if max == 0 {
            return 100;
        }
        ((self.offset * 100) / max) as u16
    }

    pub fn render(&self) -> Text<'static> {
        let lines = self
            .lines
            .iter()
            .skip(self.offset)
            .take(self.height as usize)
            .map(|line| Line::from(clip(line, self.width as usize)))
            .collect::<Vec<_>>();
        Text::from(lines)
    }
}

const TAB_WIDTH: usize = 8;

/// Expands tabs and cuts `line` to at most `width` terminal columns.
fn clip(line: &str, width: usize) -> String {
    let mut out = String::with_capacity(line.len().min(width));
    let mut columns = 0;
    for ch in line.chars() {
        if ch == '\t' {
            let stop = (columns / TAB_WIDTH + 1) * TAB_WIDTH;
            let fill = stop.min(width) - columns;
            out.extend(std::iter::repeat_n(' ', fill));
            columns += fill;
            if columns >= width {
                break;
            }
            continue;
        }

        let ch_width = ch.width().unwrap_or(0);
        if columns + ch_width > width {
            break;
        }
        out.push(ch);
        columns += ch_width;
    }
    out
}
