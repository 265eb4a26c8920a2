use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::ending::{EndingKind, Stage};
use crate::game::Game;
use crate::popup::{Anchor, Popup, PopupKind};
use crate::render::RenderPort;
use crate::room::{HotspotKind, Overlay, Room, RoomId};
use crate::state::DebugReadout;

#[derive(Debug, Clone)]
pub struct HotspotView {
    pub label: String,
    pub kind: HotspotKind,
    pub overlay: Overlay,
}

#[derive(Debug, Clone)]
pub struct RoomView {
    pub id: RoomId,
    pub title: String,
    pub background: String,
    pub hotspots: Vec<HotspotView>,
}

#[derive(Debug, Clone)]
pub struct EndingView {
    pub kind: EndingKind,
    pub text: String,
    pub stage: Stage,
}

/// Terminal-side picture of the game, updated through [`RenderPort`] and
/// drawn every frame.
#[derive(Debug, Default)]
pub struct Screen {
    room: Option<RoomView>,
    popup: Option<Popup>,
    debug: DebugReadout,
    debug_visible: bool,
    reveal: bool,
    ending: Option<EndingView>,
}

impl Screen {
    pub fn room(&self) -> Option<&RoomView> {
        self.room.as_ref()
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn debug(&self) -> &DebugReadout {
        &self.debug
    }

    pub fn debug_visible(&self) -> bool {
        self.debug_visible
    }

    pub fn hotspots_revealed(&self) -> bool {
        self.reveal
    }

    pub fn ending(&self) -> Option<&EndingView> {
        self.ending.as_ref()
    }
}

impl RenderPort for Screen {
    fn render_room(&mut self, room: &Room) {
        self.room = Some(RoomView {
            id: room.id(),
            title: room.meta.title.clone(),
            background: room.meta.background.clone(),
            hotspots: room
                .hotspots
                .iter()
                .map(|h| HotspotView {
                    label: h.display_label().to_string(),
                    kind: h.kind,
                    overlay: h.overlay(),
                })
                .collect(),
        });
    }

    fn show_popup(&mut self, popup: &Popup) {
        self.popup = Some(popup.clone());
    }

    fn hide_popups(&mut self) {
        self.popup = None;
    }

    fn set_debug_text(&mut self, readout: &DebugReadout) {
        self.debug = readout.clone();
    }

    fn set_debug_visible(&mut self, visible: bool) {
        self.debug_visible = visible;
    }

    fn set_hotspot_reveal(&mut self, reveal: bool) {
        self.reveal = reveal;
    }

    fn reveal_ending(&mut self, kind: EndingKind, text: &str, stage: Stage) {
        self.ending = Some(EndingView {
            kind,
            text: text.to_string(),
            stage,
        });
    }
}

/// Screen regions; also used to map mouse cells back to room percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenLayout {
    pub status: Rect,
    pub room: Rect,
    pub chat: Rect,
}

impl ScreenLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(3)])
            .split(area);
        let room_block = Block::default().borders(Borders::ALL);
        ScreenLayout {
            status: chunks[0],
            room: room_block.inner(chunks[1]),
            chat: chunks[2],
        }
    }

    /// Percent position inside the room container, if the cell is in it.
    pub fn room_point(&self, column: u16, row: u16) -> Option<(f32, f32)> {
        let r = self.room;
        if r.width == 0 || r.height == 0 {
            return None;
        }
        if column < r.x || column >= r.right() || row < r.y || row >= r.bottom() {
            return None;
        }
        let x = f32::from(column - r.x) * 100.0 / f32::from(r.width);
        let y = f32::from(row - r.y) * 100.0 / f32::from(r.height);
        Some((x, y))
    }

    pub fn in_chat(&self, column: u16, row: u16) -> bool {
        let c = self.chat;
        column >= c.x && column < c.right() && row >= c.y && row < c.bottom()
    }
}

pub fn draw_loading(f: &mut Frame, message: &str, failed: bool) {
    let area = f.area();
    let style = if failed {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Yellow)
    };
    let lines = vec![
        Line::from(Span::styled(" THE BUNKER ", Style::default().fg(Color::Black).bg(Color::Yellow))),
        Line::from(""),
        Line::from(Span::styled(message.to_string(), style)),
        Line::from(""),
        Line::from(Span::styled(
            if failed { "Press any key to exit" } else { "" },
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let height = lines.len() as u16;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let rect = Rect::new(area.x, y, area.width, height.min(area.height));
    f.render_widget(Paragraph::new(lines).alignment(Alignment::Center), rect);
}

pub fn draw_game(f: &mut Frame, game: &Game<Screen>) {
    let screen = game.port();
    let layout = ScreenLayout::new(f.area());

    if let Some(ending) = screen.ending() {
        if ending.stage >= Stage::PanelVisible {
            draw_ending(f, ending);
            return;
        }
    }

    draw_status(f, screen, layout.status);
    draw_room(f, screen, &layout);
    draw_chat(f, game, layout.chat);

    if let Some(popup) = screen.popup() {
        draw_popup(f, popup, layout.room);
    }
    if screen.debug_visible() {
        draw_debug(f, screen.debug(), layout.room);
    }
}

fn draw_status(f: &mut Frame, screen: &Screen, area: Rect) {
    let title = screen.room().map(|r| r.title.as_str()).unwrap_or("");
    let status = Line::from(vec![
        Span::styled(" THE BUNKER ", Style::default().fg(Color::Black).bg(Color::Yellow)),
        Span::raw("  "),
        Span::styled(format!(" {} ", title), Style::default().fg(Color::White).bg(Color::DarkGray)),
        Span::raw("  "),
        Span::styled(
            "click to inspect • type to speak • ` debug • \\ reveal",
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    f.render_widget(Paragraph::new(status).block(Block::default().borders(Borders::BOTTOM)), area);
}

fn draw_room(f: &mut Frame, screen: &Screen, layout: &ScreenLayout) {
    let Some(room) = screen.room() else {
        return;
    };
    let outer = Rect {
        x: layout.room.x.saturating_sub(1),
        y: layout.room.y.saturating_sub(1),
        width: layout.room.width + 2,
        height: layout.room.height + 2,
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} ", room.title))
        .title_bottom(Line::from(Span::styled(
            format!(" {} ", room.background),
            Style::default().fg(Color::DarkGray),
        )));
    f.render_widget(block, outer);

    let outlined = screen.hotspots_revealed() || screen.debug_visible();
    for hotspot in &room.hotspots {
        let rect = hotspot.overlay.project(layout.room);
        let label = match hotspot.kind {
            HotspotKind::Navigation => format!("» {}", hotspot.label),
            _ => hotspot.label.clone(),
        };
        if outlined {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow));
            f.render_widget(block, rect);
        }
        let label_width = u16::try_from(Line::from(label.as_str()).width()).unwrap_or(u16::MAX);
        let row = label_row(rect, label_width, layout.room);
        let style = match hotspot.kind {
            HotspotKind::Navigation => Style::default().fg(Color::Cyan),
            HotspotKind::Data => Style::default().fg(Color::Green),
            HotspotKind::Narrator => Style::default().fg(Color::Gray),
        };
        f.render_widget(Paragraph::new(label).style(style).alignment(Alignment::Center), row);
    }
}

fn draw_chat(f: &mut Frame, game: &Game<Screen>, area: Rect) {
    let mut chat = game.chat().clone();
    let (title, border) = if !game.chat_enabled() {
        (" HAVEN is responding... ", Style::default().fg(Color::DarkGray))
    } else if game.state().popup_open() {
        (" Speak to HAVEN ", Style::default().fg(Color::DarkGray))
    } else if game.chat_active() {
        (" Speak to HAVEN [Enter] ", Style::default().fg(Color::Cyan))
    } else {
        (" Speak to HAVEN ", Style::default().fg(Color::Gray))
    };
    chat.set_block(Block::default().borders(Borders::ALL).border_style(border).title(title));
    if !game.chat_enabled() || !game.chat_focused() || game.state().popup_open() {
        chat.set_cursor_style(Style::default());
    }
    f.render_widget(&chat, area);
}

/// Row for a hotspot label: centred on the overlay, widened to fit the
/// label, kept inside the room panel.
pub fn label_row(overlay: Rect, label_width: u16, room: Rect) -> Rect {
    let width = label_width.max(overlay.width).min(room.width);
    let centre = overlay.x + overlay.width / 2;
    let x = centre
        .saturating_sub(width / 2)
        .max(room.x)
        .min(room.right() - width);
    Rect::new(x, overlay.y + overlay.height / 2, width, 1)
}

/// Where a popup of `size` goes inside `container`.
pub fn popup_rect(anchor: Anchor, container: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(container.width);
    let height = height.min(container.height);
    let inset = |pct: u8| (u32::from(container.width) * u32::from(pct) / 100) as u16;
    let x = match anchor {
        Anchor::Left(pct) => container.x + inset(pct),
        Anchor::Right(pct) => container.right().saturating_sub(inset(pct) + width).max(container.x),
        Anchor::Center => container.x + (container.width - width) / 2,
    };
    let y = container.y + (container.height - height) / 2;
    Rect::new(x, y, width, height)
}

/// Rows needed to show `text` wrapped to `width` columns.
pub fn wrapped_height(text: &str, width: u16) -> u16 {
    let width = usize::from(width.max(1));
    text.lines()
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum::<usize>()
        .min(usize::from(u16::MAX)) as u16
}

fn draw_popup(f: &mut Frame, popup: &Popup, container: Rect) {
    let width_pct: u32 = if popup.kind == PopupKind::Dialogue { 60 } else { 40 };
    let width = ((u32::from(container.width) * width_pct / 100) as u16).max(20);
    let height = wrapped_height(&popup.text, width.saturating_sub(4)) + 2;
    let rect = popup_rect(popup.anchor, container, width, height);

    let (title, border, text_style) = match popup.kind {
        PopupKind::Narrator => ("", Style::default().fg(Color::Gray), Style::default().fg(Color::White)),
        PopupKind::Data => (
            " DATA ",
            Style::default().fg(Color::Green),
            Style::default().fg(Color::LightGreen),
        ),
        PopupKind::Dialogue if popup.glitching => (
            " H̷A̸V̵E̶N ",
            Style::default().fg(Color::Red).add_modifier(Modifier::SLOW_BLINK),
            Style::default().fg(Color::LightRed).add_modifier(Modifier::ITALIC),
        ),
        PopupKind::Dialogue => (" HAVEN ", Style::default().fg(Color::Cyan), Style::default().fg(Color::LightCyan)),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
        .title_bottom(Line::from(Span::styled(" click / Esc ", Style::default().fg(Color::DarkGray))));
    let paragraph = Paragraph::new(popup.text.as_str())
        .block(block)
        .style(text_style)
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, rect);
    f.render_widget(paragraph, rect);
}

fn draw_debug(f: &mut Frame, readout: &DebugReadout, container: Rect) {
    let width = 40.min(container.width);
    let rect = Rect::new(container.right().saturating_sub(width), container.y, width, 5.min(container.height));
    let text = vec![
        Line::from(readout.phase.as_str()),
        Line::from(readout.room.as_str()),
        Line::from(readout.flags.as_str()),
    ];
    f.render_widget(Clear, rect);
    f.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(Color::Yellow))
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" DEBUG ")),
        rect,
    );
}

fn draw_ending(f: &mut Frame, ending: &EndingView) {
    let area = f.area();
    let (background, foreground) = if ending.stage >= Stage::FadedToWhite {
        (Color::White, Color::Black)
    } else {
        (Color::Black, Color::Gray)
    };
    f.render_widget(Clear, area);
    f.render_widget(Block::default().style(Style::default().bg(background)), area);

    let mut lines: Vec<Line> = Vec::new();
    if ending.stage >= Stage::TextVisible {
        lines.extend(ending.text.lines().map(|l| Line::from(l.to_string())));
    }
    if ending.stage >= Stage::RestartVisible {
        lines.push(Line::from(""));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "[ R ] Restart    [ Ctrl+C ] Quit",
            Style::default().add_modifier(Modifier::BOLD),
        )));
    }
    let height = (lines.len() as u16).min(area.height);
    let rect = Rect::new(area.x, area.y + (area.height - height) / 2, area.width, height);
    f.render_widget(
        Paragraph::new(lines)
            .style(Style::default().fg(foreground).bg(background))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: false }),
        rect,
    );
}
