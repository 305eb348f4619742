/// Default WebSocket listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default cap on concurrent rooms
pub const DEFAULT_MAX_ROOMS: usize = 5;

/// Default grace period before an empty room is destroyed, in seconds
pub const DEFAULT_CLEANUP_GRACE_SECS: u64 = 60;

/// Random bytes behind a room identifier (rendered as 8 lowercase hex chars)
pub const ROOM_ID_ENTROPY_BYTES: usize = 4;

/// Prefix of every room identifier
pub const ROOM_ID_PREFIX: &str = "room-";

/// Prefix of every connection identifier
pub const CLIENT_ID_PREFIX: &str = "client-";

/// Maximum room display-name length in characters (longer names are truncated)
pub const MAX_ROOM_NAME_CHARS: usize = 64;

/// Maximum chat message length in characters (longer messages are truncated)
pub const MAX_CHAT_MESSAGE_CHARS: usize = 2000;

/// Maximum inbound WebSocket frame size in bytes
pub const MAX_FRAME_BYTES: usize = 64 * 1024;

/// Outbound frame queue depth per connection
pub const OUTBOUND_QUEUE_FRAMES: usize = 256;

/// Recommended client keep-alive (ping) interval in seconds
pub const PING_INTERVAL_SECS: u64 = 30;

/// Key derivation context for room admission keys (BLAKE3)
pub const KDF_CONTEXT_ROOM_KEY: &str = "beamcast-room-key-v1";
