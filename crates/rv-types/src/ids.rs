use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Opaque identifiers owned by external collaborators (user and post
/// services). The engine never interprets them beyond equality.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a raw identifier. Empty or whitespace-only ids are rejected.
            pub fn new(raw: impl Into<String>) -> Result<Self, TypeError> {
                let raw = raw.into();
                if raw.trim().is_empty() {
                    return Err(TypeError::InvalidId(raw));
                }
                Ok(Self(raw))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(
    /// Identity of a user as issued by the authentication service.
    UserId
);
opaque_id!(
    /// Identity of a post as issued by the post service.
    PostId
);
opaque_id!(
    /// Identity of any entity carrying a derived counter (a post or a user).
    EntityId
);

impl From<&UserId> for EntityId {
    fn from(id: &UserId) -> Self {
        Self(id.0.clone())
    }
}

impl From<&PostId> for EntityId {
    fn from(id: &PostId) -> Self {
        Self(id.0.clone())
    }
}

/// Engine-issued identifiers (UUID v7, time-ordered).
macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Generate a new time-ordered id.
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            pub fn from_uuid(uuid: uuid::Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &uuid::Uuid {
                &self.0
            }

            /// Short representation (first 8 characters).
            pub fn short_id(&self) -> String {
                self.0.to_string()[..8].to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                uuid::Uuid::parse_str(s)
                    .map(Self)
                    .map_err(|_| TypeError::InvalidId(s.to_string()))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.short_id())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Identity of an auction listing.
    ListingId
);
uuid_id!(
    /// Identity of a comment row.
    CommentId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_opaque_ids_are_rejected() {
        assert!(UserId::new("").is_err());
        assert!(PostId::new("   ").is_err());
        assert_eq!(UserId::new("u-1").unwrap().as_str(), "u-1");
    }

    #[test]
    fn entity_id_from_user_and_post() {
        let user = UserId::new("abc").unwrap();
        let post = PostId::new("abc").unwrap();
        assert_eq!(EntityId::from(&user), EntityId::from(&post));
    }

    #[test]
    fn listing_ids_are_time_ordered() {
        let a = ListingId::new();
        let b = ListingId::new();
        assert!(a < b);
    }

    #[test]
    fn listing_id_parses_its_display_form() {
        let id = ListingId::new();
        let parsed: ListingId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ListingId>().is_err());
    }

    #[test]
    fn opaque_ids_serialize_transparently() {
        let user = UserId::new("u-42").unwrap();
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"u-42\"");
    }
}
