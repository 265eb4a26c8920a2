use std::fmt;

use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};

use crate::state::Flags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomId {
    LivingQuarters,
    ControlRoom,
    MaintenanceBay,
}

impl RoomId {
    pub const ALL: [RoomId; 3] = [
        RoomId::LivingQuarters,
        RoomId::ControlRoom,
        RoomId::MaintenanceBay,
    ];

    /// Identifier used on the wire and in room files.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomId::LivingQuarters => "living_quarters",
            RoomId::ControlRoom => "control_room",
            RoomId::MaintenanceBay => "maintenance_bay",
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize)]
pub struct Room {
    pub meta: RoomMeta,
    #[serde(default)]
    pub nav: RoomNav,
    #[serde(rename = "hotspot", default)]
    pub hotspots: Vec<Hotspot>,
}

#[derive(Debug, Deserialize)]
pub struct RoomMeta {
    pub id: RoomId,
    pub title: String,
    pub background: String,
}

/// Neighbouring rooms reachable with the arrow keys.
#[derive(Debug, Deserialize, Default, Clone, Copy)]
pub struct RoomNav {
    #[serde(default)]
    pub left: Option<RoomId>,
    #[serde(default)]
    pub right: Option<RoomId>,
}

impl Room {
    pub fn id(&self) -> RoomId {
        self.meta.id
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HotspotKind {
    Navigation,
    Narrator,
    Data,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Hotspot {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub x1: u8,
    pub y1: u8,
    pub x2: u8,
    pub y2: u8,
    #[serde(rename = "type")]
    pub kind: HotspotKind,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub variant: Option<ContentVariant>,
    #[serde(default)]
    pub destination: Option<RoomId>,
}

/// Alternate content shown once `flag` is set.
#[derive(Debug, Deserialize, Clone)]
pub struct ContentVariant {
    pub flag: String,
    pub content: String,
}

impl Hotspot {
    pub fn has_valid_geometry(&self) -> bool {
        self.x1 < self.x2 && self.y1 < self.y2 && self.x2 <= 100 && self.y2 <= 100
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= f32::from(self.x1) && x < f32::from(self.x2) && y >= f32::from(self.y1) && y < f32::from(self.y2)
    }

    pub fn overlay(&self) -> Overlay {
        Overlay {
            left: self.x1,
            top: self.y1,
            width: self.x2 - self.x1,
            height: self.y2 - self.y1,
        }
    }

    pub fn resolve_content(&self, flags: &Flags) -> &str {
        match &self.variant {
            Some(variant) if flags.get(&variant.flag).copied().unwrap_or(false) => &variant.content,
            _ => &self.content,
        }
    }

    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.id
        } else {
            &self.label
        }
    }
}

/// Hotspot placement in percent of the room container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub left: u8,
    pub top: u8,
    pub width: u8,
    pub height: u8,
}

impl Overlay {
    /// Absolute cells inside `area`, never collapsing to zero size.
    pub fn project(&self, area: Rect) -> Rect {
        let scale = |extent: u16, pct: u8| (u32::from(extent) * u32::from(pct) / 100) as u16;
        let x = area.x + scale(area.width, self.left);
        let y = area.y + scale(area.height, self.top);
        let width = scale(area.width, self.width).max(1);
        let height = scale(area.height, self.height).max(1);
        Rect {
            x,
            y,
            width: width.min(area.right().saturating_sub(x).max(1)),
            height: height.min(area.bottom().saturating_sub(y).max(1)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hatch() -> Hotspot {
        Hotspot {
            id: "hatch".into(),
            label: String::new(),
            x1: 10,
            y1: 30,
            x2: 28,
            y2: 85,
            kind: HotspotKind::Data,
            event: None,
            content: "locked".into(),
            variant: Some(ContentVariant {
                flag: "sensors_dead_discovered".into(),
                content: "still locked".into(),
            }),
            destination: None,
        }
    }

    #[test]
    fn overlay_is_corner_difference() {
        let overlay = hatch().overlay();
        assert_eq!(
            overlay,
            Overlay {
                left: 10,
                top: 30,
                width: 18,
                height: 55
            }
        );
    }

    #[test]
    fn projection_keeps_percent_of_container() {
        let area = Rect::new(0, 0, 200, 100);
        let rect = hatch().overlay().project(area);
        assert_eq!(rect, Rect::new(20, 30, 36, 55));

        let offset = Rect::new(5, 2, 100, 100);
        let rect = hatch().overlay().project(offset);
        assert_eq!(rect, Rect::new(15, 32, 18, 55));
    }

    #[test]
    fn variant_only_when_flag_true() {
        let hotspot = hatch();
        let mut flags = Flags::new();
        assert_eq!(hotspot.resolve_content(&flags), "locked");
        flags.insert("sensors_dead_discovered".into(), false);
        assert_eq!(hotspot.resolve_content(&flags), "locked");
        flags.insert("sensors_dead_discovered".into(), true);
        assert_eq!(hotspot.resolve_content(&flags), "still locked");
    }

    #[test]
    fn contains_is_half_open() {
        let hotspot = hatch();
        assert!(hotspot.contains(10.0, 30.0));
        assert!(hotspot.contains(27.9, 84.9));
        assert!(!hotspot.contains(28.0, 50.0));
        assert!(!hotspot.contains(9.9, 50.0));
    }

    #[test]
    fn room_ids_round_trip_names() {
        for id in RoomId::ALL {
            let parsed: RoomId = serde_json::from_str(&format!("\"{}\"", id)).unwrap();
            assert_eq!(parsed, id);
        }
    }
}
