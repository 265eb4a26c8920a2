use crate::ending::{EndingKind, Stage};
use crate::popup::Popup;
use crate::room::Room;
use crate::state::DebugReadout;

/// Everything the game asks of a front end. The game never inspects what is
/// on screen; it only pushes changes through here.
pub trait RenderPort {
    fn render_room(&mut self, room: &Room);
    fn show_popup(&mut self, popup: &Popup);
    fn hide_popups(&mut self);
    fn set_debug_text(&mut self, readout: &DebugReadout);
    fn set_debug_visible(&mut self, visible: bool);
    fn set_hotspot_reveal(&mut self, reveal: bool);
    fn reveal_ending(&mut self, kind: EndingKind, text: &str, stage: Stage);
}
