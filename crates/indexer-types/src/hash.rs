use crate::ParseError;

/// MessageHash is the 20-byte hash that keys every hash-addressed message
/// entity (casts, reactions, links, verifications, user data, username
/// proofs). Persisted as 64-char lowercase hex, mirroring how the teacher's
/// `models::Id` persists its fixed-width payload as hex text rather than a
/// raw byte column — here we go one step further and store the hex text
/// itself (not a binary domain type) since the spec calls for a plain
/// `TEXT` primary key (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct MessageHash(String);

impl MessageHash {
    /// Accepts a hex string with or without a `0x` prefix, in any case,
    /// and normalizes to 64 lowercase hex characters.
    pub fn from_hex(input: &str) -> Result<Self, ParseError> {
        let trimmed = input.strip_prefix("0x").unwrap_or(input);
        let bytes = hex::decode(trimmed)?;
        Ok(Self::from_bytes(&bytes))
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for MessageHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl serde::Serialize for MessageHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for MessageHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn normalizes_prefix_and_case() {
        let a = MessageHash::from_hex("0xAABB").unwrap();
        let b = MessageHash::from_hex("aabb").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "aabb");
    }

    #[test]
    fn from_bytes_round_trips() {
        let h = MessageHash::from_bytes(&[0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(h.as_str(), "deadbeef");
    }
}
