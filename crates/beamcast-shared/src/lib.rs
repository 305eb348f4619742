// Wire protocol and domain types shared between the Beamcast signaling
// server and native clients.

pub mod constants;
pub mod error;
pub mod keys;
pub mod protocol;
pub mod types;

pub use error::RoomErrorCode;
pub use keys::KeyDigest;
pub use protocol::{ClientFrame, RoomSummary, ServerFrame};
pub use types::{ClientId, Role, RoomId};
