pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";

/// Relay polling period used when a config does not override it.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

pub const DEFAULT_RELAY_URL: &str = "http://127.0.0.1:5000/api/webrtc";

/// Rejection codes carried in the `code` field of relay error bodies.
pub const CODE_ROOM_FULL: &str = "room_full";
pub const CODE_ROOM_CLOSED: &str = "room_closed";
pub const CODE_UNKNOWN_USER: &str = "unknown_user";
