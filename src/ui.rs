use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;
use crate::level::Screen;

const BG: Color = Color::Rgb(9, 15, 25);
const PANEL: Color = Color::Rgb(16, 27, 44);
const PL_A: Color = Color::Rgb(17, 94, 89);
const PL_B: Color = Color::Rgb(30, 64, 175);
pub const ACCENT: Color = Color::Rgb(52, 211, 153);
pub const MUTED: Color = Color::Rgb(140, 156, 178);
pub const WARN: Color = Color::Rgb(251, 191, 36);
pub const ERROR: Color = Color::Rgb(248, 113, 113);
pub const KIND_TAG: Color = Color::Indexed(44);

pub fn render(frame: &mut Frame, app: &App) {
    let root = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let screen = app.screen();
    render_header(frame, root[0], app, &screen);
    render_body(frame, root[1], &screen);
    render_footer(frame, root[2], &screen);
}

fn render_header(frame: &mut Frame, area: Rect, app: &App, screen: &Screen) {
    let mut spans = Vec::new();
    push_powerline_segment(&mut spans, " kdrill ", Color::Black, ACCENT, PL_A);
    push_powerline_segment(
        &mut spans,
        format!(" {} ", compact_text(app.context(), 24)),
        Color::White,
        PL_A,
        PL_B,
    );
    push_powerline_segment(
        &mut spans,
        format!(" {} ", screen.title),
        Color::White,
        PL_B,
        BG,
    );

    let budget = (area.width as usize).saturating_sub(spans_width(&spans) + 1);
    if budget > 4 {
        let breadcrumb = if screen.path.is_empty() {
            display_cluster_endpoint(app.cluster())
        } else {
            screen.path.join(" › ")
        };
        spans.push(Span::styled(
            format!(" {}", compact_text(&breadcrumb, budget)),
            Style::default().fg(MUTED).bg(BG),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG).fg(Color::White)),
        area,
    );
}

fn render_body(frame: &mut Frame, area: Rect, screen: &Screen) {
    let block = Block::default()
        .title(format!(" {} ", screen.title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(ACCENT))
        .style(Style::default().bg(PANEL));
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = body_scroll(screen.cursor, visible);
    let paragraph = Paragraph::new(screen.text.clone())
        .block(block)
        .style(Style::default().fg(Color::White))
        .scroll((scroll, 0));

    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, area: Rect, screen: &Screen) {
    let mut spans = vec![Span::styled(
        format!(" {} ", screen.hint),
        Style::default().fg(MUTED).bg(BG),
    )];
    if let Some(status) = screen.status.as_deref() {
        let room = (area.width as usize).saturating_sub(spans_width(&spans) + 2);
        if room > 0 {
            spans.push(Span::styled(
                format!("│ {}", compact_text(status, room)),
                Style::default().fg(WARN).bg(BG),
            ));
        }
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).style(Style::default().bg(BG)),
        area,
    );
}

/// First body line to draw so the selected entry stays fully visible.
fn body_scroll(cursor: Option<(usize, usize)>, visible: usize) -> u16 {
    let Some((line, span)) = cursor else {
        return 0;
    };
    if visible == 0 {
        return 0;
    }

    let end = line + span.max(1);
    end.saturating_sub(visible).min(line).min(u16::MAX as usize) as u16
}

fn push_powerline_segment(
    spans: &mut Vec<Span<'static>>,
    content: impl Into<String>,
    fg: Color,
    bg: Color,
    next_bg: Color,
) {
    spans.push(Span::styled(
        content.into(),
        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
    ));
    spans.push(Span::styled("", Style::default().fg(bg).bg(next_bg)));
}

fn spans_width(spans: &[Span<'_>]) -> usize {
    spans.iter().map(|span| span.content.chars().count()).sum()
}

fn compact_text(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }

    if max_chars <= 1 {
        return "…".to_string();
    }

    let mut out = value
        .chars()
        .take(max_chars.saturating_sub(1))
        .collect::<String>();
    out.push('…');
    out
}

fn display_cluster_endpoint(cluster: &str) -> String {
    let trimmed = cluster.trim().trim_end_matches('/');
    trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed)
        .to_string()
}
