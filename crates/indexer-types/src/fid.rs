use crate::ParseError;

/// Fid is a positive integer user identifier on the upstream network.
///
/// Stored as a Postgres BIGINT; the network's wire representation is an
/// unsigned 32-bit integer, but we widen to i64 so Postgres can represent it
/// without a custom domain type (mirrors how `models::Id` in the teacher
/// widens its 8-byte payload rather than inventing a narrower SQL type).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct Fid(pub i64);

impl Fid {
    pub fn new(value: i64) -> Result<Self, ParseError> {
        if value <= 0 {
            return Err(ParseError::Fid(value.to_string()));
        }
        Ok(Self(value))
    }

    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for Fid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Fid {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s.parse().map_err(|_| ParseError::Fid(s.to_string()))?;
        Fid::new(value)
    }
}

impl serde::Serialize for Fid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Fid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        // The hub JSON API sometimes represents fids as numbers and
        // sometimes as numeric strings (e.g. inside onChainEvent payloads);
        // accept either.
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Num(i64),
            Str(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Num(n) => Fid::new(n).map_err(D::Error::custom),
            Repr::Str(s) => s.parse().map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_non_positive() {
        assert!(Fid::new(0).is_err());
        assert!(Fid::new(-1).is_err());
        assert!(Fid::new(12).is_ok());
    }

    #[test]
    fn deserializes_number_or_string() {
        let a: Fid = serde_json::from_str("12").unwrap();
        let b: Fid = serde_json::from_str(r#""12""#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_i64(), 12);
    }
}
