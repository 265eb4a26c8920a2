pub mod loader;
pub mod registry;
pub mod types;

pub use loader::load_registry;
pub use registry::{Registry, RegistryError};
pub use types::{Hotspot, HotspotKind, Overlay, Room, RoomId, RoomNav};
