use crate::config::Priority;

/// A claimed unit of work (spec.md §4.5). `attempts` counts prior tries, not
/// including the current one.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub payload: serde_json::Value,
    pub attempts: u32,
    pub priority: Priority,
    pub dedup_key: Option<String>,
}

pub(crate) fn priority_from_str(s: &str) -> Priority {
    match s {
        "high" => Priority::High,
        _ => Priority::Default,
    }
}

pub(crate) fn priority_to_str(p: Priority) -> &'static str {
    match p {
        Priority::Default => "default",
        Priority::High => "high",
    }
}
