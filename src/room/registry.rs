use std::collections::HashSet;

use anyhow::Result;
use thiserror::Error;

use super::loader::builtin_rooms;
use super::types::{Hotspot, HotspotKind, Room, RoomId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("room {0} is defined more than once")]
    DuplicateRoom(RoomId),
    #[error("no room file defines {0}")]
    MissingRoom(RoomId),
    #[error("hotspot {room}/{hotspot} has an invalid box")]
    BadGeometry { room: RoomId, hotspot: String },
    #[error("hotspot id {hotspot} appears twice in {room}")]
    DuplicateHotspot { room: RoomId, hotspot: String },
    #[error("navigation hotspot {room}/{hotspot} has no destination")]
    MissingDestination { room: RoomId, hotspot: String },
    #[error("hotspot {room}/{hotspot} has a destination but does not navigate")]
    UnexpectedDestination { room: RoomId, hotspot: String },
}

/// Static room data, validated once and never mutated.
#[derive(Debug)]
pub struct Registry {
    rooms: Vec<Room>,
}

impl Registry {
    pub fn new(rooms: Vec<Room>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for room in &rooms {
            if !seen.insert(room.id()) {
                return Err(RegistryError::DuplicateRoom(room.id()));
            }
            validate_hotspots(room)?;
        }
        if let Some(missing) = RoomId::ALL.into_iter().find(|id| !seen.contains(id)) {
            return Err(RegistryError::MissingRoom(missing));
        }
        Ok(Registry { rooms })
    }

    pub fn builtin() -> Result<Self> {
        Ok(Registry::new(builtin_rooms()?)?)
    }

    pub fn room(&self, id: RoomId) -> Result<&Room> {
        self.rooms
            .iter()
            .find(|r| r.id() == id)
            .ok_or_else(|| anyhow::anyhow!("unknown room {}", id))
    }

    pub fn hotspots(&self, id: RoomId) -> &[Hotspot] {
        self.room(id).map(|r| r.hotspots.as_slice()).unwrap_or(&[])
    }

    /// Topmost hotspot of room `id` under a point given in percent of the
    /// room panel. Later hotspots stack above earlier ones.
    pub fn hotspot_at(&self, id: RoomId, x: f32, y: f32) -> Option<&Hotspot> {
        self.hotspots(id).iter().rev().find(|h| h.contains(x, y))
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.iter()
    }
}

fn validate_hotspots(room: &Room) -> Result<(), RegistryError> {
    let mut ids = HashSet::new();
    for hotspot in &room.hotspots {
        let err_hotspot = || hotspot.id.clone();
        if !hotspot.has_valid_geometry() {
            return Err(RegistryError::BadGeometry {
                room: room.id(),
                hotspot: err_hotspot(),
            });
        }
        if !ids.insert(hotspot.id.as_str()) {
            return Err(RegistryError::DuplicateHotspot {
                room: room.id(),
                hotspot: err_hotspot(),
            });
        }
        match (hotspot.kind, hotspot.destination) {
            (HotspotKind::Navigation, None) => {
                return Err(RegistryError::MissingDestination {
                    room: room.id(),
                    hotspot: err_hotspot(),
                })
            }
            (HotspotKind::Narrator | HotspotKind::Data, Some(_)) => {
                return Err(RegistryError::UnexpectedDestination {
                    room: room.id(),
                    hotspot: err_hotspot(),
                })
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::loader::parse_room;
    use crate::state::Flags;

    fn builtin() -> Registry {
        Registry::builtin().expect("embedded rooms are valid")
    }

    #[test]
    fn every_hotspot_box_is_in_bounds() {
        let registry = builtin();
        for room in registry.rooms() {
            for h in &room.hotspots {
                assert!(h.x1 < h.x2 && h.y1 < h.y2, "{}", h.id);
                assert!(h.x2 <= 100 && h.y2 <= 100, "{}", h.id);
            }
        }
    }

    #[test]
    fn navigation_targets_exist() {
        let registry = builtin();
        for room in registry.rooms() {
            for h in room.hotspots.iter().filter(|h| h.kind == HotspotKind::Navigation) {
                let dest = h.destination.expect("navigation has destination");
                assert!(registry.room(dest).is_ok());
                assert_ne!(dest, room.id());
            }
        }
    }

    #[test]
    fn junction_hatch_switches_after_sensor_discovery() {
        let registry = builtin();
        let hatch = registry
            .hotspots(RoomId::MaintenanceBay)
            .iter()
            .find(|h| h.id == "junction_hatch")
            .unwrap();
        let mut flags = Flags::new();
        flags.insert("sensors_dead_discovered".into(), true);
        let content = hatch.resolve_content(&flags);
        assert!(content.starts_with("EXTERNAL ACCESS HATCH\nSTATUS: LOCKED"));
        assert!(content.contains("To go outside, HAVEN needs sensor confirmation."));
        assert_ne!(content, hatch.content);
    }

    #[test]
    fn hotspot_order_is_preserved() {
        let registry = builtin();
        let ids: Vec<_> = registry
            .hotspots(RoomId::LivingQuarters)
            .iter()
            .map(|h| h.id.as_str())
            .collect();
        assert_eq!(
            ids,
            [
                "your_cryopod",
                "dead_cryopods",
                "supply_cabinet",
                "personal_effects",
                "speaker_grille",
                "exit_to_control"
            ]
        );
    }

    #[test]
    fn hit_test_finds_door() {
        let registry = builtin();
        let hit = |x, y| registry.hotspot_at(RoomId::ControlRoom, x, y).map(|h| h.id.as_str());
        assert_eq!(hit(40.0, 50.0), Some("door"));
        assert_eq!(hit(99.0, 99.0), None);
        assert_eq!(hit(40.0, 50.0 + 100.0), None);
    }

    #[test]
    fn rejects_inverted_box() {
        let room = parse_room(
            "bad",
            r#"
[meta]
id = "living_quarters"
title = "x"
background = "x.png"

[[hotspot]]
id = "flipped"
x1 = 50
y1 = 10
x2 = 40
y2 = 20
type = "narrator"
"#,
        )
        .unwrap();
        let err = Registry::new(vec![room]).unwrap_err();
        assert!(matches!(err, RegistryError::BadGeometry { .. }));
    }

    #[test]
    fn rejects_navigation_without_destination() {
        let room = parse_room(
            "bad",
            r#"
[meta]
id = "living_quarters"
title = "x"
background = "x.png"

[[hotspot]]
id = "exit"
x1 = 0
y1 = 0
x2 = 10
y2 = 10
type = "navigation"
"#,
        )
        .unwrap();
        let err = Registry::new(vec![room]).unwrap_err();
        assert!(matches!(err, RegistryError::MissingDestination { .. }));
    }
}
