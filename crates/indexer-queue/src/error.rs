#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue backend error")]
    Backend(#[from] redis::RedisError),

    #[error("job payload was not valid JSON")]
    Payload(#[from] serde_json::Error),
}
