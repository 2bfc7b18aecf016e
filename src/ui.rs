use crate::audio::AudioEngine;
use crate::core::LmpCore;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use std::time::Duration;

const APP_TITLE: &str = "LMP v1.0.0  ";

const BG: Color = Color::Rgb(10, 15, 24);
const PANEL_BG: Color = Color::Rgb(19, 29, 43);
const BORDER: Color = Color::Rgb(69, 121, 176);
const TEXT: Color = Color::Rgb(214, 228, 248);
const MUTED: Color = Color::Rgb(149, 173, 204);
const ACCENT: Color = Color::Rgb(100, 203, 184);
const ALERT: Color = Color::Rgb(249, 174, 88);
const PLAYLIST: Color = Color::Rgb(156, 186, 255);

pub fn draw(frame: &mut Frame, core: &LmpCore, audio: &dyn AudioEngine, command: Option<&str>) {
    frame.render_widget(Block::default().style(Style::default().bg(BG)), frame.area());

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_header(frame, core, audio, vertical[0]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(vertical[1]);
    draw_library(frame, core, body[0]);
    draw_playlists(frame, core, body[1]);

    draw_timeline(frame, core, audio, vertical[2]);
    draw_message(frame, core, command, vertical[3]);
}

fn draw_header(frame: &mut Frame, core: &LmpCore, audio: &dyn AudioEngine, area: Rect) {
    frame.render_widget(panel_block("Status"), area);
    let inner = area.inner(Margin {
        vertical: 1,
        horizontal: 1,
    });
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let left = Paragraph::new(Line::from(vec![
        Span::styled(
            APP_TITLE,
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("Tracks {}", core.library.len()),
            Style::default().fg(TEXT),
        ),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(
            format!("Mode {}", core.playback.mode().as_str()),
            Style::default().fg(ALERT),
        ),
    ]));
    frame.render_widget(left, chunks[0]);

    let playing = if audio.is_paused() {
        format!("Paused: {}", core.current_track_name().unwrap_or("-"))
    } else if audio.is_active() {
        format!("Playing: {}", core.current_track_name().unwrap_or("-"))
    } else {
        String::from("Idle")
    };
    let right = Paragraph::new(Line::from(vec![
        Span::styled(playing, Style::default().fg(TEXT)),
        Span::styled("  |  ", Style::default().fg(MUTED)),
        Span::styled(format!("Vol {}%", core.volume), Style::default().fg(ACCENT)),
    ]))
    .alignment(Alignment::Right);
    frame.render_widget(right, chunks[1]);
}

fn draw_library(frame: &mut Frame, core: &LmpCore, area: Rect) {
    let current = core.playback.current_path();
    let items: Vec<ListItem> = core
        .library
        .tracks()
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let marker = if current == Some(track.path.as_path()) {
                "  > "
            } else {
                "    "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(MUTED)),
                Span::styled(format!("{:>3}. ", index + 1), Style::default().fg(MUTED)),
                Span::styled(track.name.as_str(), Style::default().fg(TEXT)),
            ]))
        })
        .collect();

    let list = List::new(items).block(panel_block("Library"));
    frame.render_widget(list, area);
}

fn draw_playlists(frame: &mut Frame, core: &LmpCore, area: Rect) {
    let active = core.playback.active_playlist();
    let items: Vec<ListItem> = core
        .playlists
        .iter()
        .enumerate()
        .map(|(index, playlist)| {
            let label = if active == Some(index) {
                format!(
                    "{} ({} tracks, at {})",
                    playlist.name(),
                    playlist.len(),
                    core.playback.active_position() + 1
                )
            } else {
                format!("{} ({} tracks)", playlist.name(), playlist.len())
            };
            let style = if active == Some(index) {
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(PLAYLIST)
            };
            ListItem::new(Span::styled(label, style))
        })
        .collect();

    let list = List::new(items).block(panel_block("Playlists"));
    frame.render_widget(list, area);
}

fn draw_timeline(frame: &mut Frame, core: &LmpCore, audio: &dyn AudioEngine, area: Rect) {
    let position = audio.position_seconds();
    let duration = core.playback.duration_seconds();

    let text = match (position, duration) {
        (Some(position), Some(duration)) if duration > 0.0 => format!(
            "{} {} / {}",
            progress_bar(Some(position / duration), 26),
            format_duration(Duration::from_secs_f64(position.min(duration))),
            format_duration(Duration::from_secs_f64(duration)),
        ),
        (Some(position), _) => format!(
            "{} {} / --:--",
            progress_bar(None, 26),
            format_duration(Duration::from_secs_f64(position)),
        ),
        _ => format!("{} --:-- / --:--", progress_bar(None, 26)),
    };

    let timeline = Paragraph::new(Span::styled(text, Style::default().fg(TEXT)))
        .block(panel_block("Timeline"))
        .wrap(Wrap { trim: true });
    frame.render_widget(timeline, area);
}

fn draw_message(frame: &mut Frame, core: &LmpCore, command: Option<&str>, area: Rect) {
    let line = if let Some(input) = command {
        Line::from(Span::styled(
            format!(":{input}"),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ))
    } else {
        Line::from(vec![
            Span::styled(": command, help for list", Style::default().fg(MUTED)),
            Span::styled("  |  ", Style::default().fg(MUTED)),
            Span::styled(core.status.as_str(), Style::default().fg(TEXT)),
        ])
    };
    frame.render_widget(Paragraph::new(line).block(panel_block("Message")), area);
}

fn panel_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(TEXT).add_modifier(Modifier::BOLD),
        ))
        .border_style(Style::default().fg(BORDER))
        .style(Style::default().bg(PANEL_BG))
}

fn format_duration(duration: Duration) -> String {
    let total_seconds = duration.as_secs();
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;
    format!("{minutes:02}:{seconds:02}")
}

fn progress_bar(ratio: Option<f64>, width: usize) -> String {
    let clamped = ratio.unwrap_or(0.0).clamp(0.0, 1.0);
    let filled = (clamped * width as f64).round() as usize;
    let mut bar = String::with_capacity(width + 2);
    bar.push('[');
    bar.push_str(&"#".repeat(filled));
    bar.push_str(&"-".repeat(width.saturating_sub(filled)));
    bar.push(']');
    bar
}
