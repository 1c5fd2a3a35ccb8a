use crate::core::PlayerState;
use crate::library::Catalog;
use crate::model::{PlaybackMode, PlayerStatus};
use crate::view::ViewState;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

const LIST_TITLE: &str = "> Songs <";
const LIST_SUBTITLE: &str = concat!("> ('q' - quit) reed ", env!("CARGO_PKG_VERSION"), " <");
const PLAYING_TITLE: &str = "> Playing <";
const PAUSED_LABEL: &str = "> PAUSE <";

pub struct Screen<'a> {
    pub catalog: &'a Catalog,
    pub player: &'a PlayerState,
    pub view: &'a ViewState,
    pub status: Option<&'a str>,
}

/// Left pane gets `w/2` columns at 0, right pane `w/2` at `w/2 + w%2`.
pub fn panes(area: Rect) -> [Rect; 2] {
    let half = area.width / 2;
    [
        Rect::new(area.x, area.y, half, area.height),
        Rect::new(area.x + half + area.width % 2, area.y, half, area.height),
    ]
}

/// Rows available for track names inside the bordered list pane.
pub fn list_rows(area: Rect) -> usize {
    usize::from(area.height.saturating_sub(2))
}

pub fn draw(frame: &mut Frame, screen: &Screen<'_>) {
    let [list, playing] = panes(frame.area());
    draw_list(frame, list, screen);
    draw_playing(frame, playing, screen);
    if screen.view.selected().is_some() {
        frame.set_cursor_position(cursor_position(list, screen.view));
    }
}

pub fn cursor_position(list: Rect, view: &ViewState) -> Position {
    let row = u16::try_from(view.cursor_row()).unwrap_or(u16::MAX);
    Position::new(list.x + 2, list.y.saturating_add(row))
}

fn pane_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(Line::from(title).centered())
}

fn draw_list(frame: &mut Frame, area: Rect, screen: &Screen<'_>) {
    let block = pane_block(LIST_TITLE).title_bottom(Line::from(LIST_SUBTITLE).centered());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let max_name = usize::from(area.width.saturating_sub(5));
    let current = screen
        .player
        .is_playing()
        .then(|| screen.player.current_index())
        .flatten();

    let lines: Vec<Line> = screen
        .view
        .visible()
        .filter_map(|index| screen.catalog.get(index).map(|track| (index, track)))
        .map(|(index, track)| {
            let text = format!(" > {}", truncate(&track.name, max_name));
            if Some(index) == current {
                Line::styled(text, Style::default().add_modifier(Modifier::BOLD | Modifier::REVERSED))
            } else {
                Line::from(text)
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_playing(frame: &mut Frame, area: Rect, screen: &Screen<'_>) {
    let mut block = pane_block(PLAYING_TITLE);
    if screen.player.status() == PlayerStatus::Paused {
        block = block.title_bottom(Line::from(PAUSED_LABEL).centered());
    }
    frame.render_widget(block, area);

    if area.width < 3 || area.height < 3 {
        return;
    }
    let middle = area.y + area.height / 2;

    let track = screen
        .player
        .is_playing()
        .then(|| screen.player.current_index())
        .flatten()
        .and_then(|index| screen.catalog.get(index));
    if let Some(track) = track {
        write_centered(frame, area, middle, &track.name, Style::default().add_modifier(Modifier::BOLD));
    }

    let mode = match screen.player.mode() {
        PlaybackMode::Manual => None,
        PlaybackMode::Autoplay => Some(String::from(PlaybackMode::Autoplay.label())),
        PlaybackMode::Shuffle => screen.player.shuffle().map(|shuffle| {
            format!(
                "{} {}/{}",
                PlaybackMode::Shuffle.label(),
                shuffle.position() + 1,
                shuffle.len()
            )
        }),
    };
    if let Some(mode) = mode
        && middle + 1 < area.bottom() - 1
    {
        write_centered(frame, area, middle + 1, &mode, Style::default().add_modifier(Modifier::DIM));
    }

    if let Some(status) = screen.status
        && area.height >= 4
    {
        let row = area.bottom() - 3;
        if row != middle && row > area.y {
            write_centered(frame, area, row, status, Style::default());
        }
    }
}

/// Centers `text` on `row` when it fits between the borders, otherwise
/// truncates it and starts at column 1.
fn write_centered(frame: &mut Frame, area: Rect, row: u16, text: &str, style: Style) {
    let room = usize::from(area.width.saturating_sub(2));
    let len = text.chars().count();
    let (col, shown) = if len <= room {
        (usize::from(area.width).saturating_sub(len) / 2, text.to_string())
    } else {
        (1, truncate(text, room))
    };

    let width = u16::try_from(shown.chars().count()).unwrap_or(area.width);
    let col = u16::try_from(col).unwrap_or(1).max(1);
    let target = Rect::new(area.x + col, row, width, 1).intersection(area);
    frame.render_widget(Paragraph::new(Line::styled(shown, style)), target);
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
