/// Errors surfaced by [`crate::HubClient`] (spec.md §4.1, §7).
///
/// Mirrors the teacher's per-module `Error` enum idiom (`agent::jobs::Error`):
/// one variant per failure mode, each wrapping its `#[source]` rather than
/// flattening into a string.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("hub request to {path} failed on every configured endpoint")]
    Unavailable { path: String },

    #[error("hub endpoint {endpoint} returned {status}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("request to hub endpoint {endpoint} failed")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("decoding response body from {endpoint} failed")]
    Decode {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("no hub endpoints configured")]
    NoEndpoints,
}
