//! JSON wire shapes returned by the upstream hub's HTTP API (spec.md §6.1).
//!
//! These are total, closed tagged unions rather than the dynamic/duck-typed
//! shapes the upstream network's reference clients use — the redesign flag
//! in spec.md §9 calls for exactly this. A message whose `data.type` or
//! whose structural variant doesn't match one of the known spellings decodes
//! to `MessageBody::Unknown`/`HubEventBody::Unknown` rather than failing the
//! whole page, so one malformed/future message type can't take down an
//! entire backfill or realtime page (spec.md §7: malformed payloads are
//! dropped, not fatal).

use indexer_types::{Fid, LinkType, MessageHash, ReactionType, UserDataType};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CastId {
    pub fid: Fid,
    pub hash: MessageHash,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ReactionTarget {
    Cast(CastId),
    Url { target_url: String },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum CastParent {
    Cast(CastId),
    Url { parent_url: String },
}

/// Raw, field-optional shape of `data` as returned by the hub; every known
/// message type's body arrives under a differently-named sibling key, so we
/// decode permissively into this shape first and then narrow by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessageData {
    #[serde(rename = "type")]
    type_: String,
    fid: Fid,
    timestamp: u32,
    cast_add_body: Option<RawCastAddBody>,
    cast_remove_body: Option<RawCastRemoveBody>,
    reaction_body: Option<RawReactionBody>,
    link_body: Option<RawLinkBody>,
    verification_add_address_body: Option<RawVerificationAddBody>,
    verification_remove_body: Option<RawVerificationRemoveBody>,
    user_data_body: Option<RawUserDataBody>,
    username_proof_body: Option<RawUsernameProofBody>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCastAddBody {
    text: String,
    #[serde(default)]
    embeds: Vec<serde_json::Value>,
    #[serde(default)]
    mentions: Vec<Fid>,
    #[serde(default)]
    mentions_positions: Vec<u32>,
    parent_cast_id: Option<CastId>,
    parent_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCastRemoveBody {
    target_hash: MessageHash,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawReactionBody {
    #[serde(rename = "type")]
    type_: ReactionTypeWire,
    target_cast_id: Option<CastId>,
    target_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum ReactionTypeWire {
    Named(String),
    Numeric(i32),
}

impl ReactionTypeWire {
    fn resolve(&self) -> Option<ReactionType> {
        match self {
            Self::Named(s) => match s.as_str() {
                "REACTION_TYPE_LIKE" => Some(ReactionType::Like),
                "REACTION_TYPE_RECAST" => Some(ReactionType::Recast),
                other => other.parse().ok(),
            },
            Self::Numeric(n) => ReactionType::from_numeric(*n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLinkBody {
    #[serde(rename = "type")]
    type_: String,
    target_fid: Fid,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerificationAddBody {
    address: String,
    block_hash: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawVerificationRemoveBody {
    address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserDataBody {
    #[serde(rename = "type")]
    type_: UserDataTypeWire,
    value: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum UserDataTypeWire {
    Named(String),
    Numeric(i32),
}

impl UserDataTypeWire {
    fn resolve(&self) -> Option<UserDataType> {
        match self {
            Self::Named(s) => {
                let trimmed = s.strip_prefix("USER_DATA_TYPE_").unwrap_or(s);
                trimmed.to_lowercase().parse().ok()
            }
            Self::Numeric(n) => UserDataType::from_numeric(*n),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUsernameProofBody {
    name: String,
    owner: String,
    signature: String,
    timestamp: u32,
}

/// The typed body of a decoded message (spec.md §3, §4.2).
#[derive(Debug, Clone)]
pub enum MessageBody {
    CastAdd {
        text: String,
        embeds: Vec<serde_json::Value>,
        mentions: Vec<Fid>,
        mentions_positions: Vec<u32>,
        parent: Option<CastParent>,
    },
    CastRemove {
        target_hash: MessageHash,
    },
    ReactionAdd {
        reaction_type: ReactionType,
        target: ReactionTarget,
    },
    ReactionRemove {
        reaction_type: ReactionType,
        target: ReactionTarget,
    },
    LinkAdd {
        link_type: LinkType,
        target_fid: Fid,
    },
    LinkRemove {
        link_type: LinkType,
        target_fid: Fid,
    },
    VerificationAddEthAddress {
        address: String,
        block_hash: Option<String>,
    },
    VerificationRemove {
        address: String,
    },
    UserDataAdd {
        data_type: UserDataType,
        value: String,
    },
    UsernameProof {
        name: String,
        owner: String,
        signature: String,
    },
    /// A structurally valid message whose type this client doesn't (yet)
    /// model. Factories return `None` for these (spec.md §4.2).
    Unknown,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub hash: MessageHash,
    pub fid: Fid,
    pub timestamp: u32,
    pub body: MessageBody,
}

impl<'de> Deserialize<'de> for Message {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Envelope {
            data: RawMessageData,
            hash: MessageHash,
        }
        let Envelope { data, hash } = Envelope::deserialize(deserializer)?;

        let body = match data.type_.as_str() {
            "MESSAGE_TYPE_CAST_ADD" => data.cast_add_body.map(|b| MessageBody::CastAdd {
                text: b.text,
                embeds: b.embeds,
                mentions: b.mentions,
                mentions_positions: b.mentions_positions,
                parent: match (b.parent_cast_id, b.parent_url) {
                    (Some(cast), _) => Some(CastParent::Cast(cast)),
                    (None, Some(parent_url)) => Some(CastParent::Url { parent_url }),
                    (None, None) => None,
                },
            }),
            "MESSAGE_TYPE_CAST_REMOVE" => data
                .cast_remove_body
                .map(|b| MessageBody::CastRemove { target_hash: b.target_hash }),
            "MESSAGE_TYPE_REACTION_ADD" => data.reaction_body.and_then(|b| {
                let reaction_type = b.type_.resolve()?;
                let target = match (b.target_cast_id, b.target_url) {
                    (Some(cast), _) => ReactionTarget::Cast(cast),
                    (None, Some(target_url)) => ReactionTarget::Url { target_url },
                    (None, None) => return None,
                };
                Some(MessageBody::ReactionAdd { reaction_type, target })
            }),
            "MESSAGE_TYPE_REACTION_REMOVE" => data.reaction_body.and_then(|b| {
                let reaction_type = b.type_.resolve()?;
                let target = match (b.target_cast_id, b.target_url) {
                    (Some(cast), _) => ReactionTarget::Cast(cast),
                    (None, Some(target_url)) => ReactionTarget::Url { target_url },
                    (None, None) => return None,
                };
                Some(MessageBody::ReactionRemove { reaction_type, target })
            }),
            "MESSAGE_TYPE_LINK_ADD" => data.link_body.and_then(|b| {
                if b.type_ != "follow" {
                    return None;
                }
                Some(MessageBody::LinkAdd {
                    link_type: LinkType::Follow,
                    target_fid: b.target_fid,
                })
            }),
            "MESSAGE_TYPE_LINK_REMOVE" => data.link_body.and_then(|b| {
                if b.type_ != "follow" {
                    return None;
                }
                Some(MessageBody::LinkRemove {
                    link_type: LinkType::Follow,
                    target_fid: b.target_fid,
                })
            }),
            "MESSAGE_TYPE_VERIFICATION_ADD_ETH_ADDRESS" => {
                data.verification_add_address_body.map(|b| MessageBody::VerificationAddEthAddress {
                    address: b.address,
                    block_hash: b.block_hash,
                })
            }
            "MESSAGE_TYPE_VERIFICATION_REMOVE" => {
                data.verification_remove_body.map(|b| MessageBody::VerificationRemove { address: b.address })
            }
            "MESSAGE_TYPE_USER_DATA_ADD" => data.user_data_body.and_then(|b| {
                Some(MessageBody::UserDataAdd {
                    data_type: b.type_.resolve()?,
                    value: b.value,
                })
            }),
            "MESSAGE_TYPE_USERNAME_PROOF" => data.username_proof_body.map(|b| MessageBody::UsernameProof {
                name: b.name,
                owner: b.owner,
                signature: b.signature,
            }),
            _ => Some(MessageBody::Unknown),
        }
        .unwrap_or(MessageBody::Unknown);

        Ok(Message {
            hash,
            fid: data.fid,
            timestamp: data.timestamp,
            body,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsernameProof {
    pub name: String,
    pub owner: String,
    pub signature: String,
    pub timestamp: u32,
    pub fid: Fid,
}

/// One of the four opaque on-chain event bodies (spec.md §3/§4.2). Kept as
/// raw JSON — only the signer body's nested `type` is inspected, by rule R2
/// (spec.md §4.8), everything else is opaque to this client by design.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnChainEvent {
    #[serde(rename = "type")]
    pub type_: String,
    pub chain_id: i64,
    pub block_number: i64,
    pub block_hash: String,
    pub block_timestamp: i64,
    pub transaction_hash: String,
    pub log_index: i32,
    pub fid: Fid,
    pub signer_event_body: Option<serde_json::Value>,
    pub id_register_event_body: Option<serde_json::Value>,
    pub key_register_event_body: Option<serde_json::Value>,
    pub storage_rent_event_body: Option<serde_json::Value>,
}

/// A hub event (spec.md §4.8). The outer `HUB_EVENT_TYPE_*` discriminant is
/// modeled as a closed tagged union, per the redesign flag in spec.md §9.
#[derive(Debug, Clone)]
pub enum HubEventBody {
    MergeMessage { message: Message },
    MergeOnChainEvent { event: OnChainEvent },
    PruneMessage,
    RevokeMessage,
    Unknown,
}

#[derive(Debug, Clone)]
pub struct HubEvent {
    pub id: u64,
    pub body: HubEventBody,
}

impl<'de> Deserialize<'de> for HubEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            id: u64,
            #[serde(rename = "type")]
            type_: String,
            merge_message_body: Option<MergeMessageBody>,
            merge_on_chain_event_body: Option<MergeOnChainEventBody>,
        }
        #[derive(Deserialize)]
        struct MergeMessageBody {
            message: Message,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct MergeOnChainEventBody {
            on_chain_event: OnChainEvent,
        }

        let raw = Raw::deserialize(deserializer)?;
        let body = match raw.type_.as_str() {
            "HUB_EVENT_TYPE_MERGE_MESSAGE" => raw
                .merge_message_body
                .map(|b| HubEventBody::MergeMessage { message: b.message })
                .unwrap_or(HubEventBody::Unknown),
            "HUB_EVENT_TYPE_MERGE_ON_CHAIN_EVENT" => raw
                .merge_on_chain_event_body
                .map(|b| HubEventBody::MergeOnChainEvent { event: b.on_chain_event })
                .unwrap_or(HubEventBody::Unknown),
            "HUB_EVENT_TYPE_PRUNE_MESSAGE" => HubEventBody::PruneMessage,
            "HUB_EVENT_TYPE_REVOKE_MESSAGE" => HubEventBody::RevokeMessage,
            _ => HubEventBody::Unknown,
        };

        Ok(HubEvent { id: raw.id, body })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default)]
    pub messages: Vec<T>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventsPage {
    #[serde(default)]
    pub events: Vec<HubEvent>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProofsPage {
    #[serde(default)]
    pub proofs: Vec<UsernameProof>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OnChainEventsPage {
    #[serde(default)]
    pub events: Vec<OnChainEvent>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decodes_cast_add() {
        let json = serde_json::json!({
            "data": {
                "type": "MESSAGE_TYPE_CAST_ADD",
                "fid": 2,
                "timestamp": 48246339,
                "castAddBody": {
                    "text": "hello",
                    "embeds": [],
                    "mentions": [],
                    "mentionsPositions": [],
                    "parentCastId": {"fid": 1, "hash": "aa".repeat(32)}
                }
            },
            "hash": "bb".repeat(32),
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert_eq!(msg.fid, Fid::new(2).unwrap());
        match msg.body {
            MessageBody::CastAdd { text, parent, .. } => {
                assert_eq!(text, "hello");
                assert!(matches!(parent, Some(CastParent::Cast(_))));
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }

    #[test]
    fn unknown_message_type_is_unknown_not_error() {
        let json = serde_json::json!({
            "data": {"type": "MESSAGE_TYPE_SOMETHING_FUTURE", "fid": 1, "timestamp": 0},
            "hash": "cc".repeat(32),
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(matches!(msg.body, MessageBody::Unknown));
    }

    #[test]
    fn decodes_merge_on_chain_event() {
        let json = serde_json::json!({
            "id": 500,
            "type": "HUB_EVENT_TYPE_MERGE_ON_CHAIN_EVENT",
            "mergeOnChainEventBody": {
                "onChainEvent": {
                    "type": "EVENT_TYPE_SIGNER",
                    "chainId": 10,
                    "blockNumber": 1,
                    "blockHash": "0x00",
                    "blockTimestamp": 0,
                    "transactionHash": "0x00",
                    "logIndex": 0,
                    "fid": 99,
                    "signerEventBody": {"eventType": "SIGNER_EVENT_TYPE_ADD"}
                }
            }
        });
        let event: HubEvent = serde_json::from_value(json).unwrap();
        assert_eq!(event.id, 500);
        assert!(matches!(event.body, HubEventBody::MergeOnChainEvent { .. }));
    }
}
