mod relay_rooms;
mod room_log;

pub use relay_rooms::*;
pub use room_log::*;
