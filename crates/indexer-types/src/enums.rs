//! Closed enumerated sets shared by the hub wire protocol and the
//! persistence schema (spec.md §4.2, GLOSSARY).
//!
//! Each type maps cleanly to a Postgres enum (`sqlx::Type` with
//! `type_name`/`rename_all`), following `agent_sql::FlowType`'s pattern in
//! the teacher. Types that also appear as a numeric code in the hub's typed
//! (protobuf) decode additionally carry a `from_numeric`/`as_numeric` pair so
//! a factory can accept either representation and always produce the same
//! compact string (spec.md §4.2: "both a numeric enum and a string enum map
//! to the same compact string").

use crate::ParseError;

macro_rules! closed_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $str:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        // Persisted as plain TEXT (not a native Postgres enum type), by
        // delegating to the `&str`/`String` impls the same way the teacher's
        // `TextJson` newtype delegates its wire encoding to `serde_json`.
        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }
            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'q> sqlx::Encode<'q, sqlx::Postgres> for $name {
            fn encode_by_ref(
                &self,
                buf: &mut sqlx::postgres::PgArgumentBuffer,
            ) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.as_str(), buf)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
                Ok(s.parse()?)
            }
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($str => Ok(Self::$variant),)+
                    other => Err(ParseError::UnknownEnumValue {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                self.as_str().serialize(serializer)
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                use serde::de::Error;
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

closed_enum!(
    /// spec.md GLOSSARY "UserData types (closed set)".
    UserDataType {
        Pfp => "pfp",
        Display => "display",
        Bio => "bio",
        Username => "username",
        Url => "url",
        Location => "location",
        Twitter => "twitter",
        Github => "github",
        Banner => "banner",
        EthereumAddress => "ethereum_address",
        SolanaAddress => "solana_address",
    }
);

impl UserDataType {
    /// Numeric codes as carried by the hub's typed (protobuf) decode path.
    pub fn from_numeric(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Pfp,
            2 => Self::Display,
            3 => Self::Bio,
            5 => Self::Url,
            6 => Self::Username,
            7 => Self::Location,
            8 => Self::Twitter,
            9 => Self::Github,
            10 => Self::Banner,
            11 => Self::EthereumAddress,
            12 => Self::SolanaAddress,
            _ => return None,
        })
    }
}

closed_enum!(
    ReactionType {
        Like => "like",
        Recast => "recast",
    }
);

impl ReactionType {
    pub fn from_numeric(code: i32) -> Option<Self> {
        Some(match code {
            1 => Self::Like,
            2 => Self::Recast,
            _ => return None,
        })
    }
}

closed_enum!(
    /// Only `follow` is tracked (spec.md §3 Link entity).
    LinkType {
        Follow => "follow",
    }
);

closed_enum!(
    VerificationProtocol {
        Ethereum => "ethereum",
    }
);

closed_enum!(
    /// Discriminates which of the four `*_event_body` columns on
    /// `on_chain_events` is populated (spec.md §4.2).
    OnChainEventType {
        Signer => "signer",
        SignerMigrated => "signer_migrated",
        IdRegistry => "id_registry",
        KeyRegistry => "key_registry",
        StorageRent => "storage_rent",
    }
);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn numeric_and_string_agree() {
        for code in 1..=12 {
            if let Some(t) = UserDataType::from_numeric(code) {
                let round_tripped: UserDataType = t.as_str().parse().unwrap();
                assert_eq!(t, round_tripped);
            }
        }
    }

    #[test]
    fn unknown_value_errors() {
        assert!("bogus".parse::<ReactionType>().is_err());
    }

    #[test]
    fn serde_round_trip() {
        let v = serde_json::to_string(&LinkType::Follow).unwrap();
        assert_eq!(v, "\"follow\"");
        let back: LinkType = serde_json::from_str(&v).unwrap();
        assert_eq!(back, LinkType::Follow);
    }
}
