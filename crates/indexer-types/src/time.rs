use chrono::{DateTime, Utc};

/// The hub's compact timestamps count seconds from this instant rather than
/// the Unix epoch: 2021-01-01T00:00:00Z, a fixed constant of the upstream
/// network (carried over exactly from the wire protocol; see spec.md §3's
/// "network epoch" invariant).
pub const FARCASTER_EPOCH_UNIX_SECONDS: i64 = 1_609_459_200;

/// Converts a compact hub timestamp (seconds since the network epoch) into
/// an absolute UTC instant. This conversion is one-directional: once a
/// message is persisted, callers store the resulting `DateTime<Utc>` and
/// never need to convert back to a network timestamp.
pub fn farcaster_time_to_utc(network_seconds: u32) -> DateTime<Utc> {
    DateTime::from_timestamp(FARCASTER_EPOCH_UNIX_SECONDS + network_seconds as i64, 0)
        .expect("network timestamp is always in range for a valid u32 offset")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn zero_maps_to_epoch() {
        assert_eq!(
            farcaster_time_to_utc(0).to_rfc3339(),
            "2021-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn one_day_advances_by_one_day() {
        let t = farcaster_time_to_utc(86_400);
        assert_eq!(t.to_rfc3339(), "2021-01-02T00:00:00+00:00");
    }
}
