use serde::{Deserialize, Serialize};

use crate::counter::{CounterField, CounterKey};
use crate::ids::{CommentId, EntityId, PostId, UserId};

/// A relationship row. Counters are derived from the live set of these rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Relation {
    Like {
        user_id: UserId,
        post_id: PostId,
    },
    Follow {
        follower_id: UserId,
        followee_id: UserId,
    },
    Comment {
        comment_id: CommentId,
        post_id: PostId,
        author_id: UserId,
        text: String,
    },
}

/// Uniqueness key of a relationship row; also the handle used for deletion.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKey {
    Like { user_id: UserId, post_id: PostId },
    Follow { follower_id: UserId, followee_id: UserId },
    Comment(CommentId),
}

impl Relation {
    pub fn key(&self) -> RelationKey {
        match self {
            Self::Like { user_id, post_id } => RelationKey::Like {
                user_id: user_id.clone(),
                post_id: post_id.clone(),
            },
            Self::Follow {
                follower_id,
                followee_id,
            } => RelationKey::Follow {
                follower_id: follower_id.clone(),
                followee_id: followee_id.clone(),
            },
            Self::Comment { comment_id, .. } => RelationKey::Comment(*comment_id),
        }
    }

    /// Counters that move by one when this row is created or deleted.
    pub fn counter_effects(&self) -> Vec<CounterKey> {
        match self {
            Self::Like { post_id, .. } => {
                vec![CounterKey::new(EntityId::from(post_id), CounterField::LikesCount)]
            }
            Self::Follow {
                follower_id,
                followee_id,
            } => vec![
                CounterKey::new(EntityId::from(follower_id), CounterField::FollowingCount),
                CounterKey::new(EntityId::from(followee_id), CounterField::FollowersCount),
            ],
            Self::Comment { post_id, .. } => {
                vec![CounterKey::new(EntityId::from(post_id), CounterField::CommentsCount)]
            }
        }
    }

    /// Whether this row is one of the rows counted by `key`.
    pub fn counts_toward(&self, key: &CounterKey) -> bool {
        self.counter_effects().iter().any(|k| k == key)
    }
}
