//! Protocol module containing the obs-websocket message types, the JSON codec,
//! and the request-id sequence.

pub mod codec;
pub mod messages;
pub mod sequence;

pub use codec::{decode_message, encode_message, ProtocolError};
pub use messages::*;
pub use sequence::RequestIdSequence;
