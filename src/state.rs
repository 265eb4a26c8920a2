use std::collections::BTreeMap;

use tracing::debug;

use crate::room::RoomId;

/// Backend-owned progress flags, cached on the client.
pub type Flags = BTreeMap<String, bool>;

pub const START_ROOM: RoomId = RoomId::LivingQuarters;
pub const START_PHASE: u32 = 1;

/// Everything the client knows about the running session.
///
/// Flags and phase only change through [`GameState::apply_server_update`];
/// the room only through [`GameState::navigate`].
#[derive(Debug, Clone)]
pub struct GameState {
    session_id: String,
    current_room: RoomId,
    phase: u32,
    flags: Flags,
    popup_open: bool,
}

impl GameState {
    pub fn new(session_id: String, flags: Flags) -> Self {
        GameState {
            session_id,
            current_room: START_ROOM,
            phase: START_PHASE,
            flags,
            popup_open: false,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn current_room(&self) -> RoomId {
        self.current_room
    }

    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }

    pub fn popup_open(&self) -> bool {
        self.popup_open
    }

    /// Replaces the cached flags and phase with the server's copy.
    pub fn apply_server_update(&mut self, flags: Flags, phase: u32) {
        debug!(phase, flags = flags.len(), "server update");
        self.flags = flags;
        self.phase = phase;
    }

    /// Returns false when a popup blocks navigation.
    pub fn navigate(&mut self, destination: RoomId) -> bool {
        if self.popup_open {
            return false;
        }
        self.current_room = destination;
        true
    }

    pub fn set_popup_open(&mut self, open: bool) {
        self.popup_open = open;
    }

    pub fn debug_flags(&self) -> String {
        let active: Vec<String> = self
            .flags
            .iter()
            .filter(|(_, set)| **set)
            .map(|(name, _)| name.replace('_', " "))
            .collect();
        if active.is_empty() {
            "none".to_string()
        } else {
            active.join(", ")
        }
    }

    pub fn debug_readout(&self) -> DebugReadout {
        DebugReadout {
            phase: format!("Phase: {}", self.phase),
            room: format!("Room: {}", self.current_room),
            flags: format!("Flags: {}", self.debug_flags()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebugReadout {
    pub phase: String,
    pub room: String,
    pub flags: String,
}
