use crate::state::GameState;

/// Horizontal inset, in percent of the container, for click-anchored popups.
pub const POPUP_INSET: u8 = 10;
/// Phase from which HAVEN's dialogue box glitches.
pub const GLITCH_PHASE: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupKind {
    Narrator,
    Data,
    Dialogue,
}

/// A click position in percent of the room container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickPoint {
    pub x: f32,
    pub y: f32,
}

impl ClickPoint {
    pub fn new(x: f32, y: f32) -> Self {
        ClickPoint { x, y }
    }

    pub fn in_left_half(&self) -> bool {
        self.x < 50.0
    }
}

/// Where a popup sits. Click-anchored popups are vertically centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left(u8),
    Right(u8),
    Center,
}

impl Anchor {
    /// Opposite half from the click so the popup never covers what was clicked.
    pub fn away_from(click: ClickPoint) -> Self {
        if click.in_left_half() {
            Anchor::Right(POPUP_INSET)
        } else {
            Anchor::Left(POPUP_INSET)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Popup {
    pub kind: PopupKind,
    pub text: String,
    pub anchor: Anchor,
    pub glitching: bool,
}

/// Holds the single visible popup, if any.
#[derive(Debug, Default)]
pub struct PopupManager {
    current: Option<Popup>,
}

impl PopupManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Popup> {
        self.current.as_ref()
    }

    pub fn show_narrator(&mut self, state: &mut GameState, text: &str, click: ClickPoint) -> &Popup {
        self.open(state, PopupKind::Narrator, text, Anchor::away_from(click), false)
    }

    pub fn show_data(&mut self, state: &mut GameState, text: &str, click: ClickPoint) -> &Popup {
        self.open(state, PopupKind::Data, text, Anchor::away_from(click), false)
    }

    pub fn show_dialogue(&mut self, state: &mut GameState, text: &str) -> &Popup {
        let glitching = state.phase() >= GLITCH_PHASE;
        self.open(state, PopupKind::Dialogue, text, Anchor::Center, glitching)
    }

    pub fn dismiss_all(&mut self, state: &mut GameState) {
        self.current = None;
        state.set_popup_open(false);
    }

    fn open(&mut self, state: &mut GameState, kind: PopupKind, text: &str, anchor: Anchor, glitching: bool) -> &Popup {
        state.set_popup_open(true);
        self.current.insert(Popup {
            kind,
            text: text.to_string(),
            anchor,
            glitching,
        })
    }
}
