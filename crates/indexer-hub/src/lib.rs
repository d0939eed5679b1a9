//! Component A: the hub HTTP client (spec.md §4.1).
//!
//! Grounded on `flow_client::Client`'s bearer-authenticated request shape and
//! retry-loop idiom, generalized from one endpoint to a rotating ordered
//! list with rate-limit tracking per endpoint.

mod client;
mod error;
pub mod wire;

pub use client::{HubClient, MessageEndpoint};
pub use error::HubError;
pub use wire::{CastId, CastParent, HubEvent, HubEventBody, Message, MessageBody, OnChainEvent, ReactionTarget, UsernameProof};

#[cfg(test)]
mod test {
    use super::*;
    use url::Url;

    #[test]
    fn rejects_empty_endpoint_list() {
        let err = HubClient::new(Vec::new(), reqwest::Client::new());
        assert!(matches!(err, Err(HubError::NoEndpoints)));
    }

    #[test]
    fn accepts_configured_endpoints() {
        let client = HubClient::new(vec![Url::parse("http://localhost:2281/").unwrap()], reqwest::Client::new());
        assert!(client.is_ok());
    }
}
