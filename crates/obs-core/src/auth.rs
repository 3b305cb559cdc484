//! Challenge-response authentication for the obs-websocket handshake.
//!
//! When the server is password-protected, its `Hello` carries a `salt` and a
//! `challenge`.  The client proves it knows the password without sending it:
//!
//! ```text
//! secret = base64( sha256( password + salt ) )
//! auth   = base64( sha256( secret + challenge ) )
//! ```
//!
//! Both base64 steps use the standard alphabet with padding.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

/// Computes the `authentication` string to put in `Identify`.
pub fn authentication_string(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(sha256(&[password.as_bytes(), salt.as_bytes()]));
    STANDARD.encode(sha256(&[secret.as_bytes(), challenge.as_bytes()]))
}

fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}
