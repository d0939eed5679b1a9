//! Row shapes for the tables in spec.md §3. `New*` types are what Component
//! B's factories produce; `*Row` types are what readers of the schema get
//! back. Grounded on `agent_sql::publications::Row`'s plain-struct-plus-
//! `query_as!` pattern.

use chrono::{DateTime, Utc};
use indexer_types::{Fid, LinkType, MessageHash, ReactionType, UserDataType, VerificationProtocol};

#[derive(Debug, Clone)]
pub struct NewCast {
    pub hash: MessageHash,
    pub fid: Fid,
    pub text: String,
    pub parent_hash: Option<MessageHash>,
    pub parent_fid: Option<Fid>,
    pub parent_url: Option<String>,
    pub root_parent_hash: Option<MessageHash>,
    pub root_parent_fid: Option<Fid>,
    pub timestamp: DateTime<Utc>,
    pub embeds: Option<serde_json::Value>,
    pub mentions: Option<serde_json::Value>,
    pub mentions_positions: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewReaction {
    pub hash: MessageHash,
    pub fid: Fid,
    pub reaction_type: ReactionType,
    pub target_hash: Option<MessageHash>,
    pub target_fid: Option<Fid>,
    pub target_url: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLink {
    pub hash: MessageHash,
    pub fid: Fid,
    pub target_fid: Fid,
    pub link_type: LinkType,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewVerification {
    pub hash: MessageHash,
    pub fid: Fid,
    pub address: String,
    pub protocol: VerificationProtocol,
    pub block_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUserData {
    pub hash: MessageHash,
    pub fid: Fid,
    pub data_type: UserDataType,
    pub value: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUsernameProof {
    pub hash: MessageHash,
    pub fid: Fid,
    pub name: String,
    pub owner: String,
    pub signature: String,
    pub timestamp: DateTime<Utc>,
}

/// One of the four `*_event_body` columns carries `body`; the rest are NULL
/// (spec.md §4.2). `kind` names which.
#[derive(Debug, Clone)]
pub struct NewOnChainEvent {
    pub kind: indexer_types::OnChainEventType,
    pub chain_id: i64,
    pub block_number: i64,
    pub block_hash: String,
    pub block_timestamp: DateTime<Utc>,
    pub transaction_hash: String,
    pub log_index: i32,
    pub fid: Fid,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TargetRow {
    pub fid: i64,
    pub is_root: bool,
    pub added_at: DateTime<Utc>,
    pub last_synced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncStateRow {
    pub name: String,
    pub last_event_id: Option<i64>,
    pub last_synced_at: Option<DateTime<Utc>>,
}
