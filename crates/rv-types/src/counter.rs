use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::EntityId;

/// A derived aggregate field on a post or a user.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterField {
    LikesCount,
    CommentsCount,
    FollowersCount,
    FollowingCount,
}

impl CounterField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LikesCount => "likes_count",
            Self::CommentsCount => "comments_count",
            Self::FollowersCount => "followers_count",
            Self::FollowingCount => "following_count",
        }
    }
}

impl fmt::Display for CounterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CounterField {
    type Err = TypeError;

    /// Accepts both the storage form (`likes_count`) and the JSON form (`likesCount`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "likes_count" | "likesCount" => Ok(Self::LikesCount),
            "comments_count" | "commentsCount" => Ok(Self::CommentsCount),
            "followers_count" | "followersCount" => Ok(Self::FollowersCount),
            "following_count" | "followingCount" => Ok(Self::FollowingCount),
            other => Err(TypeError::UnknownCounterField(other.to_string())),
        }
    }
}

/// Addresses one counter: an entity plus one of its aggregate fields.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CounterKey {
    pub entity: EntityId,
    pub field: CounterField,
}

impl CounterKey {
    pub fn new(entity: impl Into<EntityId>, field: CounterField) -> Self {
        Self {
            entity: entity.into(),
            field,
        }
    }
}

impl fmt::Display for CounterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity, self.field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_spellings() {
        assert_eq!("likesCount".parse::<CounterField>().unwrap(), CounterField::LikesCount);
        assert_eq!(
            "following_count".parse::<CounterField>().unwrap(),
            CounterField::FollowingCount
        );
        assert!("views".parse::<CounterField>().is_err());
    }

    #[test]
    fn key_display() {
        let key = CounterKey::new(EntityId::new("p1").unwrap(), CounterField::LikesCount);
        assert_eq!(key.to_string(), "p1/likes_count");
    }
}
