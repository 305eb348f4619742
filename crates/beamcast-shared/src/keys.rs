use std::fmt;

use subtle::ConstantTimeEq;

use crate::constants::KDF_CONTEXT_ROOM_KEY;

/// BLAKE3 digest of a room admission key.
///
/// The plaintext key is hashed immediately on arrival and lives only on the
/// stack of the admission call; rooms store this digest and nothing else.
#[derive(Clone)]
pub struct KeyDigest([u8; 32]);

impl KeyDigest {
    pub fn of(key: &str) -> Self {
        Self(blake3::derive_key(KDF_CONTEXT_ROOM_KEY, key.as_bytes()))
    }

    /// Constant-time comparison against a submitted key.
    pub fn verify(&self, key: &str) -> bool {
        let submitted = Self::of(key);
        self.0.as_slice().ct_eq(submitted.0.as_slice()).unwrap_u8() == 1
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// Room keys are low-entropy, so even the digest stays out of logs.
impl fmt::Debug for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyDigest({}..)", hex::encode(&self.0[..2]))
    }
}
