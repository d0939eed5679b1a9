use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use exponential_backoff::Backoff;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::HubError;
use crate::wire::{EventsPage, HubEvent, Message, OnChainEvent, OnChainEventsPage, Page, ProofsPage, UsernameProof};
use indexer_types::Fid;

const DEFAULT_PAGE_SIZE: u32 = 100;
const MAX_PAGE_SIZE: u32 = 1000;
const MAX_RETRIES: u32 = 3;
const RETRY_MIN: Duration = Duration::from_millis(200);
const RETRY_MAX: Duration = Duration::from_secs(5);

struct Endpoint {
    base_url: Url,
    /// Set when a 429 response names a future Retry-After instant; checked
    /// before the endpoint is tried again (spec.md §4.1 rate-limit handling).
    rate_limited_until: Mutex<Option<Instant>>,
}

impl Endpoint {
    fn is_rate_limited(&self) -> bool {
        match *self.rate_limited_until.lock().unwrap() {
            Some(until) => Instant::now() < until,
            None => false,
        }
    }

    fn mark_rate_limited(&self, retry_after: Duration) {
        *self.rate_limited_until.lock().unwrap() = Some(Instant::now() + retry_after);
    }

    fn clear_rate_limit(&self) {
        *self.rate_limited_until.lock().unwrap() = None;
    }
}

/// A client for Component A (spec.md §4.1): multiple configured hub
/// endpoints tried in order, rotating away from a failing or rate-limited
/// endpoint and resetting to the first endpoint after a successful call.
///
/// Grounded on `flow_client::Client`'s `agent_unary` + retry-loop shape, with
/// the single-endpoint assumption generalized to a rotating list.
pub struct HubClient {
    http: reqwest::Client,
    endpoints: Vec<Endpoint>,
    /// Index of the endpoint to try first on the next call.
    cursor: AtomicUsize,
}

impl HubClient {
    pub fn new(endpoints: Vec<Url>, http: reqwest::Client) -> Result<Self, HubError> {
        if endpoints.is_empty() {
            return Err(HubError::NoEndpoints);
        }
        Ok(Self {
            http,
            endpoints: endpoints
                .into_iter()
                .map(|base_url| Endpoint {
                    base_url,
                    rate_limited_until: Mutex::new(None),
                })
                .collect(),
            cursor: AtomicUsize::new(0),
        })
    }

    /// Ordered endpoint indices to try this call: starting from `cursor`,
    /// wrapping around, skipping currently rate-limited endpoints unless
    /// every endpoint is rate-limited (in which case we try anyway).
    fn endpoint_order(&self) -> Vec<usize> {
        let start = self.cursor.load(Ordering::Relaxed) % self.endpoints.len();
        let mut order: Vec<usize> = (0..self.endpoints.len()).map(|i| (start + i) % self.endpoints.len()).collect();
        if order.iter().any(|&i| !self.endpoints[i].is_rate_limited()) {
            order.retain(|&i| !self.endpoints[i].is_rate_limited());
        }
        order
    }

    #[tracing::instrument(skip(self, query), err)]
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, HubError> {
        let order = self.endpoint_order();
        let backoff = Backoff::new(MAX_RETRIES, RETRY_MIN, RETRY_MAX);
        let mut delays = backoff.into_iter();

        let mut last_err = None;
        for idx in order {
            let endpoint = &self.endpoints[idx];
            let url = endpoint.base_url.join(path).map_err(|_| HubError::Unavailable { path: path.to_string() })?;

            loop {
                let response = self.http.get(url.clone()).query(query).send().await;
                let response = match response {
                    Ok(r) => r,
                    Err(source) => {
                        last_err = Some(HubError::Transport {
                            endpoint: endpoint.base_url.to_string(),
                            source,
                        });
                        break;
                    }
                };

                if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or(RETRY_MAX);
                    tracing::warn!(endpoint = %endpoint.base_url, retry_after_secs = retry_after.as_secs(), "hub endpoint rate limited");
                    endpoint.mark_rate_limited(retry_after);
                    last_err = Some(HubError::Status {
                        endpoint: endpoint.base_url.to_string(),
                        status: response.status(),
                    });
                    break;
                }

                if response.status().is_server_error() {
                    last_err = Some(HubError::Status {
                        endpoint: endpoint.base_url.to_string(),
                        status: response.status(),
                    });
                    match delays.next() {
                        Some(Some(delay)) => {
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                        _ => break,
                    }
                }

                if !response.status().is_success() {
                    return Err(HubError::Status {
                        endpoint: endpoint.base_url.to_string(),
                        status: response.status(),
                    });
                }

                let body = response.json::<T>().await.map_err(|source| HubError::Decode {
                    endpoint: endpoint.base_url.to_string(),
                    source,
                })?;

                endpoint.clear_rate_limit();
                self.cursor.store(idx, Ordering::Relaxed);
                return Ok(body);
            }
        }

        Err(last_err.unwrap_or(HubError::Unavailable { path: path.to_string() }))
    }

    pub async fn messages_by_fid(&self, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        self.fetch_message_page("v1/castsByFid", fid, page_size, page_token).await
    }

    pub async fn reactions_by_fid(&self, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        self.fetch_message_page("v1/reactionsByFid", fid, page_size, page_token).await
    }

    pub async fn links_by_fid(&self, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        self.fetch_message_page("v1/linksByFid", fid, page_size, page_token).await
    }

    pub async fn verifications_by_fid(&self, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        self.fetch_message_page("v1/verificationsByFid", fid, page_size, page_token).await
    }

    pub async fn user_data_by_fid(&self, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        self.fetch_message_page("v1/userDataByFid", fid, page_size, page_token).await
    }

    async fn fetch_message_page(&self, path: &str, fid: Fid, page_size: u32, page_token: Option<&str>) -> Result<(Vec<Message>, Option<String>), HubError> {
        let fid_str = fid.as_i64().to_string();
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let mut query = vec![("fid", fid_str.as_str()), ("pageSize", page_size.as_str())];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let page: Page<Message> = self.get_json(path, &query).await?;
        Ok((page.messages, page.next_page_token))
    }

    /// Pages through every message on `path` for `fid`, collecting all
    /// results. Used by the Backfill Worker (spec.md §4.6).
    pub async fn get_all_messages_by_fid(&self, path: MessageEndpoint, fid: Fid) -> Result<Vec<Message>, HubError> {
        let mut out = Vec::new();
        let mut token = None;
        loop {
            let (mut page, next) = match path {
                MessageEndpoint::Casts => self.messages_by_fid(fid, DEFAULT_PAGE_SIZE, token.as_deref()).await?,
                MessageEndpoint::Reactions => self.reactions_by_fid(fid, DEFAULT_PAGE_SIZE, token.as_deref()).await?,
                MessageEndpoint::Links => self.links_by_fid(fid, DEFAULT_PAGE_SIZE, token.as_deref()).await?,
                MessageEndpoint::Verifications => self.verifications_by_fid(fid, DEFAULT_PAGE_SIZE, token.as_deref()).await?,
                MessageEndpoint::UserData => self.user_data_by_fid(fid, DEFAULT_PAGE_SIZE, token.as_deref()).await?,
            };
            out.append(&mut page);
            match next {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => break,
            }
        }
        Ok(out)
    }

    pub async fn on_chain_events_by_fid(&self, fid: Fid, event_type: Option<&str>) -> Result<Vec<OnChainEvent>, HubError> {
        let fid_str = fid.as_i64().to_string();
        let mut out = Vec::new();
        let mut token = None;
        loop {
            let mut query = vec![("fid", fid_str.as_str())];
            if let Some(t) = event_type {
                query.push(("eventType", t));
            }
            if let Some(t) = token.as_deref() {
                query.push(("pageToken", t));
            }
            let page: OnChainEventsPage = self.get_json("v1/onChainEventsByFid", &query).await?;
            out.extend(page.events);
            match page.next_page_token {
                Some(t) if !t.is_empty() => token = Some(t),
                _ => break,
            }
        }
        Ok(out)
    }

    pub async fn username_proofs_by_fid(&self, fid: Fid) -> Result<Vec<UsernameProof>, HubError> {
        let fid_str = fid.as_i64().to_string();
        let page: ProofsPage = self.get_json("v1/usernameProofsByFid", &[("fid", fid_str.as_str())]).await?;
        Ok(page.proofs)
    }

    /// The realtime event stream's page, polled from `since_event_id`
    /// onward by the Realtime Worker (spec.md §4.7).
    pub async fn events(&self, since_event_id: u64, page_size: u32) -> Result<Vec<HubEvent>, HubError> {
        let since = since_event_id.to_string();
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE).to_string();
        let page: EventsPage = self
            .get_json("v1/events", &[("fromEventId", since.as_str()), ("pageSize", page_size.as_str())])
            .await?;
        Ok(page.events)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum MessageEndpoint {
    Casts,
    Reactions,
    Links,
    Verifications,
    UserData,
}
