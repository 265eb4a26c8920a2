use anyhow::{Context, Result};
use std::path::Path;

use super::registry::Registry;
use super::types::Room;

const BUILTIN_ROOMS: [(&str, &str); 3] = [
    (
        "room_01_living_quarters.toml",
        include_str!("../../rooms/room_01_living_quarters.toml"),
    ),
    (
        "room_02_control_room.toml",
        include_str!("../../rooms/room_02_control_room.toml"),
    ),
    (
        "room_03_maintenance_bay.toml",
        include_str!("../../rooms/room_03_maintenance_bay.toml"),
    ),
];

pub fn parse_room(name: &str, content: &str) -> Result<Room> {
    let room: Room = toml::from_str(content).with_context(|| format!("parsing room file {}", name))?;
    Ok(room)
}

pub fn load_room(path: &Path) -> Result<Room> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_room(&path.display().to_string(), &content)
}

/// Loads every `room_*.toml` under `dir`, in file name order.
pub fn load_registry(dir: &Path) -> Result<Registry> {
    let pattern = dir.join("room_*.toml");
    let pattern = pattern.to_string_lossy();
    let mut paths: Vec<_> = glob::glob(&pattern)
        .with_context(|| format!("bad room pattern {}", pattern))?
        .filter_map(|p| p.ok())
        .collect();

    // room_01, room_02, ... keeps the registry order stable
    paths.sort();

    let mut rooms = Vec::new();
    for path in paths {
        rooms.push(load_room(&path)?);
    }

    Ok(Registry::new(rooms)?)
}

pub fn builtin_rooms() -> Result<Vec<Room>> {
    BUILTIN_ROOMS
        .iter()
        .map(|(name, content)| parse_room(name, content))
        .collect()
}
