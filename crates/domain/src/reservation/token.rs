//! Self-service cancellation capability.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use serde::{Deserialize, Serialize};

/// Number of random bytes behind every token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Length of the base64url (unpadded) encoding of [`TOKEN_BYTES`].
const TOKEN_LEN: usize = 43;

/// An unguessable token authorizing cancellation of exactly one reservation.
///
/// Knowledge of the token is the whole authorization: it is independent of
/// the reservation ID, issued once at creation and never rotated.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CancellationToken(String);

impl CancellationToken {
    /// Generates a new token from the thread-local CSPRNG.
    pub fn issue() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Parses a token presented by a client.
    ///
    /// Returns None for anything that could not have been issued, so lookups
    /// for garbage input never reach the store.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let well_formed = raw.len() == TOKEN_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        well_formed.then(|| Self(raw.to_string()))
    }

    /// Wraps a token loaded from storage without re-validating it.
    pub fn from_stored(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "CancellationToken({prefix}…)")
    }
}
