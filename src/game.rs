use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};
use tui_textarea::TextArea;

use crate::backend::{EventRequest, MessageRequest, NewGameResponse, Reply, Request};
use crate::ending::{EndingKind, EndingSequencer, Stage};
use crate::popup::{ClickPoint, PopupManager};
use crate::render::RenderPort;
use crate::room::{Hotspot, HotspotKind, Registry, RoomId, RoomNav};
use crate::state::GameState;

const EXIT_DOOR: &str = "door";
const CONCEDE_FLAG: &str = "ai_concedes";
const DOOR_RELEASE_LINE: &str = "Door release confirmed. Goodbye, Resident. Survive.";
const DOOR_RELEASE_DELAY: Duration = Duration::from_millis(500);
pub const FALLBACK_LINE: &str = "Systems nominal. Please repeat your query, Resident.";

/// How the hotspot reveal key behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealMode {
    /// Reveal while held; needs a terminal that reports key releases.
    Hold,
    Toggle,
}

/// What a mouse click landed on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickTarget {
    Room(ClickPoint),
    Chat,
    Elsewhere,
}

/// Routes player input and backend replies into state changes and render
/// calls. Owns the only `GameState`.
pub struct Game<P: RenderPort> {
    registry: Rc<Registry>,
    state: GameState,
    popups: PopupManager,
    port: P,
    chat: TextArea<'static>,
    chat_enabled: bool,
    chat_active: bool,
    chat_focused: bool,
    debug_visible: bool,
    reveal: bool,
    reveal_mode: RevealMode,
    now: Duration,
    door_release_at: Option<Duration>,
    ending: Option<EndingSequencer>,
    outbox: Vec<Request>,
}

impl<P: RenderPort> Game<P> {
    /// Builds the game from a freshly opened session and shows the first
    /// room. A session without an id is fatal to the game.
    pub fn start(session: NewGameResponse, registry: Rc<Registry>, port: P, reveal_mode: RevealMode) -> Result<Self> {
        if session.session_id.trim().is_empty() {
            anyhow::bail!("backend returned an empty session id");
        }
        info!(session = %session.session_id, "session started");

        let state = GameState::new(session.session_id, session.flags);
        let mut game = Game {
            registry,
            state,
            popups: PopupManager::new(),
            port,
            chat: TextArea::default(),
            chat_enabled: true,
            chat_active: false,
            chat_focused: true,
            debug_visible: false,
            reveal: false,
            reveal_mode,
            now: Duration::ZERO,
            door_release_at: None,
            ending: None,
            outbox: Vec::new(),
        };
        game.render_current_room();
        game.outbox.push(Request::Greeting {
            session_id: game.state.session_id().to_string(),
        });
        Ok(game)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn chat(&self) -> &TextArea<'static> {
        &self.chat
    }

    pub fn chat_enabled(&self) -> bool {
        self.chat_enabled
    }

    pub fn chat_active(&self) -> bool {
        self.chat_active
    }

    pub fn chat_focused(&self) -> bool {
        self.chat_focused
    }

    /// True from the moment an ending is decided, including the door delay.
    pub fn game_over(&self) -> bool {
        self.ending.is_some() || self.door_release_at.is_some()
    }

    pub fn ending_stage(&self) -> Option<Stage> {
        self.ending.as_ref().map(|e| e.stage())
    }

    pub fn restart_available(&self) -> bool {
        self.ending_stage() == Some(Stage::RestartVisible)
    }

    /// Requests queued since the last call, for the worker to run.
    pub fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.outbox)
    }

    /// Advances the game clock, firing the door release and ending stages.
    pub fn tick(&mut self, elapsed: Duration) {
        self.now += elapsed;

        if let Some(due) = self.door_release_at {
            if self.now >= due {
                self.door_release_at = None;
                self.begin_ending(EndingKind::Success);
            }
        }

        if let Some(sequencer) = self.ending.as_mut() {
            for stage in sequencer.advance(self.now) {
                self.port.reveal_ending(sequencer.kind(), sequencer.text(), stage);
            }
        }
    }

    pub fn on_click(&mut self, target: ClickTarget) {
        if self.game_over() {
            return;
        }
        // A click with a popup open only ever dismisses it.
        if self.state.popup_open() {
            self.dismiss_all();
            return;
        }

        match target {
            ClickTarget::Room(point) => {
                let registry = Rc::clone(&self.registry);
                if let Some(hotspot) = registry.hotspot_at(self.state.current_room(), point.x, point.y) {
                    self.activate_hotspot(hotspot, point);
                }
            }
            ClickTarget::Chat => self.chat_focused = true,
            ClickTarget::Elsewhere => self.chat_focused = false,
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if self.game_over() {
            return;
        }

        let reveal_key = matches!(key.code, KeyCode::Char('\\') | KeyCode::Char('|'));
        if key.kind == KeyEventKind::Release {
            if reveal_key && self.reveal_mode == RevealMode::Hold {
                self.set_reveal(false);
            }
            return;
        }

        if self.state.popup_open() && matches!(key.code, KeyCode::Esc | KeyCode::Enter) {
            self.dismiss_all();
            return;
        }

        if key.code == KeyCode::Char('`') {
            self.debug_visible = !self.debug_visible;
            self.port.set_debug_visible(self.debug_visible);
            return;
        }

        if reveal_key {
            match self.reveal_mode {
                RevealMode::Hold => self.set_reveal(true),
                RevealMode::Toggle => self.set_reveal(!self.reveal),
            }
            return;
        }

        if self.state.popup_open() {
            return;
        }

        let chat_empty = self.chat_text().is_empty();
        match key.code {
            KeyCode::Enter => self.submit_chat(),
            KeyCode::Esc => {
                if chat_empty {
                    self.chat_active = false;
                }
            }
            KeyCode::Left if chat_empty => self.step_room(|nav| nav.left),
            KeyCode::Right if chat_empty => self.step_room(|nav| nav.right),
            KeyCode::Char(_) if !key.modifiers.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => {
                self.chat_focused = true;
                self.chat_active = true;
                if self.chat_enabled {
                    self.chat.input(key);
                }
            }
            _ => {
                if self.chat_enabled {
                    self.chat.input(key);
                    self.chat_active = !self.chat_text().is_empty();
                }
            }
        }
    }

    pub fn on_reply(&mut self, reply: Reply) {
        match reply {
            Reply::NewGame(_) => debug!("session reply ignored mid-game"),
            Reply::Greeting(Ok(greeting)) => self.show_dialogue(&greeting.haven_response),
            Reply::Greeting(Err(err)) => warn!(error = %format!("{:#}", err), "greeting failed"),
            Reply::Event(Ok(update)) => {
                self.state.apply_server_update(update.flags, update.phase);
                self.refresh_debug();
            }
            Reply::Event(Err(err)) => warn!(error = %format!("{:#}", err), "event failed"),
            Reply::Message(Ok(response)) => {
                self.state.apply_server_update(response.flags, response.phase);
                self.refresh_debug();
                self.show_dialogue(&response.haven_response);
                if response.game_over {
                    match response.ending {
                        Some(kind) => self.begin_ending(kind),
                        None => warn!("game over without an ending"),
                    }
                }
                self.chat_enabled = true;
            }
            Reply::Message(Err(err)) => {
                warn!(error = %format!("{:#}", err), "message failed");
                self.show_dialogue(FALLBACK_LINE);
                self.chat_enabled = true;
            }
        }
    }

    pub fn navigate(&mut self, destination: RoomId) {
        if !self.state.navigate(destination) {
            return;
        }
        debug!(room = %destination, "navigate");
        self.render_current_room();
    }

    pub fn dismiss_all(&mut self) {
        if let Some(popup) = self.popups.current() {
            debug!(kind = ?popup.kind, "popup dismissed");
        }
        self.popups.dismiss_all(&mut self.state);
        self.port.hide_popups();
        self.chat_focused = true;
    }

    fn activate_hotspot(&mut self, hotspot: &Hotspot, click: ClickPoint) {
        debug!(hotspot = %hotspot.id, "hotspot clicked");
        if hotspot.kind == HotspotKind::Navigation {
            if let Some(destination) = hotspot.destination {
                self.navigate(destination);
            }
            return;
        }

        if hotspot.id == EXIT_DOOR && self.state.flag(CONCEDE_FLAG) {
            info!("door released");
            self.show_dialogue(DOOR_RELEASE_LINE);
            self.door_release_at = Some(self.now + DOOR_RELEASE_DELAY);
            return;
        }

        if let Some(event) = &hotspot.event {
            self.outbox.push(Request::Event(EventRequest {
                session_id: self.state.session_id().to_string(),
                event: event.clone(),
                room: self.state.current_room().to_string(),
            }));
        }

        // Content comes from the flags cached before the event reply lands.
        let content = hotspot.resolve_content(self.state.flags());
        let popup = match hotspot.kind {
            HotspotKind::Data => self.popups.show_data(&mut self.state, content, click),
            _ => self.popups.show_narrator(&mut self.state, content, click),
        };
        self.port.show_popup(popup);
        self.chat_focused = false;
    }

    fn show_dialogue(&mut self, text: &str) {
        let popup = self.popups.show_dialogue(&mut self.state, text);
        self.port.show_popup(popup);
    }

    fn submit_chat(&mut self) {
        if !self.chat_enabled {
            return;
        }
        let text = self.chat_text();
        if text.trim().is_empty() {
            return;
        }
        // Cleared before the reply; a failed send loses the text.
        self.chat = TextArea::default();
        self.chat_active = false;
        self.chat_enabled = false;
        self.outbox.push(Request::Message(MessageRequest {
            session_id: self.state.session_id().to_string(),
            text,
        }));
    }

    fn begin_ending(&mut self, kind: EndingKind) {
        if self.ending.is_some() {
            return;
        }
        info!(ending = %kind, "game over");
        self.door_release_at = None;
        let sequencer = EndingSequencer::start(kind, self.now);
        self.port.reveal_ending(kind, sequencer.text(), Stage::Triggered);
        self.ending = Some(sequencer);
    }

    fn step_room(&mut self, pick: impl Fn(RoomNav) -> Option<RoomId>) {
        let next = self
            .registry
            .room(self.state.current_room())
            .ok()
            .and_then(|room| pick(room.nav));
        if let Some(next) = next {
            self.navigate(next);
        }
    }

    fn set_reveal(&mut self, reveal: bool) {
        if self.reveal != reveal {
            self.reveal = reveal;
            self.port.set_hotspot_reveal(reveal);
        }
    }

    fn render_current_room(&mut self) {
        match self.registry.room(self.state.current_room()) {
            Ok(room) => self.port.render_room(room),
            Err(err) => warn!(error = %err, "cannot render room"),
        }
        self.refresh_debug();
    }

    fn refresh_debug(&mut self) {
        self.port.set_debug_text(&self.state.debug_readout());
    }

    fn chat_text(&self) -> String {
        self.chat.lines().join("\n")
    }
}
