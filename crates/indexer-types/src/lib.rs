pub mod enums;
pub mod fid;
pub mod hash;
pub mod time;

pub use enums::{LinkType, OnChainEventType, ReactionType, UserDataType, VerificationProtocol};
pub use fid::Fid;
pub use hash::MessageHash;
pub use time::farcaster_time_to_utc;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("invalid fid: {0}")]
    Fid(String),
    #[error("invalid message hash: {0}")]
    Hash(#[from] hex::FromHexError),
    #[error("unknown {kind}: {value:?}")]
    UnknownEnumValue { kind: &'static str, value: String },
}
