use std::sync::Arc;

use serde::{Deserialize, Serialize};

use rv_store::{EntityDirectory, ReconcileQueue, RelationStore};
use rv_types::{CommentId, CounterKey, PostId, Relation, RelationKey, UserId};

use crate::error::{CounterError, CounterResult};
use crate::ledger::{CounterLedger, CounterOutcome};

/// A counter delta that did not land after its relationship row committed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialFailure {
    pub key: CounterKey,
    pub delta: i64,
    pub reason: String,
}

/// Result of a relationship operation.
///
/// The primary effect (the row write) succeeded. `partial_failures` lists
/// counter deltas that did not land; each has been queued for the auditor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SagaOutcome {
    pub relation: Relation,
    pub counters: Vec<CounterOutcome>,
    pub partial_failures: Vec<PartialFailure>,
}

impl SagaOutcome {
    pub fn is_complete(&self) -> bool {
        self.partial_failures.is_empty()
    }
}

/// Two-step relationship writes: the row, then its counters.
///
/// Counter deltas are applied only after the row write is confirmed, and on
/// deletion only after the row is confirmed gone. Nothing is rolled back: a
/// committed row is valid on its own and the auditor repairs the counter.
pub struct RelationSaga {
    relations: Arc<dyn RelationStore>,
    directory: Arc<dyn EntityDirectory>,
    queue: Arc<dyn ReconcileQueue>,
    ledger: Arc<CounterLedger>,
}

impl RelationSaga {
    pub fn new(
        relations: Arc<dyn RelationStore>,
        directory: Arc<dyn EntityDirectory>,
        queue: Arc<dyn ReconcileQueue>,
        ledger: Arc<CounterLedger>,
    ) -> Self {
        Self {
            relations,
            directory,
            queue,
            ledger,
        }
    }

    pub async fn like(&self, user: &UserId, post: &PostId) -> CounterResult<SagaOutcome> {
        self.require_post(post).await?;
        let like = Relation::Like {
            user_id: user.clone(),
            post_id: post.clone(),
        };
        self.create(like, "like").await
    }

    pub async fn unlike(&self, user: &UserId, post: &PostId) -> CounterResult<SagaOutcome> {
        let key = RelationKey::Like {
            user_id: user.clone(),
            post_id: post.clone(),
        };
        self.remove(&key, "like").await
    }

    pub async fn follow(&self, follower: &UserId, followee: &UserId) -> CounterResult<SagaOutcome> {
        if follower == followee {
            return Err(CounterError::InvalidInput("cannot follow yourself".into()));
        }
        if !self.directory.user_exists(followee).await? {
            return Err(CounterError::NotFound("user"));
        }
        let follow = Relation::Follow {
            follower_id: follower.clone(),
            followee_id: followee.clone(),
        };
        self.create(follow, "follow").await
    }

    pub async fn unfollow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> CounterResult<SagaOutcome> {
        let key = RelationKey::Follow {
            follower_id: follower.clone(),
            followee_id: followee.clone(),
        };
        self.remove(&key, "follow").await
    }

    pub async fn add_comment(
        &self,
        post: &PostId,
        author: &UserId,
        text: &str,
    ) -> CounterResult<SagaOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CounterError::InvalidInput("comment text is empty".into()));
        }
        self.require_post(post).await?;
        let comment = Relation::Comment {
            comment_id: CommentId::new(),
            post_id: post.clone(),
            author_id: author.clone(),
            text: text.to_string(),
        };
        self.create(comment, "comment").await
    }

    /// Only the comment's author may delete it.
    pub async fn delete_comment(
        &self,
        comment: &CommentId,
        requester: &UserId,
    ) -> CounterResult<SagaOutcome> {
        let key = RelationKey::Comment(*comment);
        match self.relations.get(&key).await? {
            Some(Relation::Comment { author_id, .. }) if &author_id == requester => {}
            Some(_) => return Err(CounterError::Forbidden),
            None => return Err(CounterError::NotFound("comment")),
        }
        self.remove(&key, "comment").await
    }

    async fn require_post(&self, post: &PostId) -> CounterResult<()> {
        match self.directory.post_owner(post).await? {
            Some(_) => Ok(()),
            None => Err(CounterError::NotFound("post")),
        }
    }

    async fn create(&self, relation: Relation, what: &'static str) -> CounterResult<SagaOutcome> {
        if !self.relations.create(&relation).await? {
            return Err(CounterError::AlreadyExists(what));
        }
        Ok(self.apply_effects(relation, 1).await)
    }

    async fn remove(&self, key: &RelationKey, what: &'static str) -> CounterResult<SagaOutcome> {
        let relation = self
            .relations
            .delete(key)
            .await?
            .ok_or(CounterError::NotFound(what))?;
        Ok(self.apply_effects(relation, -1).await)
    }

    async fn apply_effects(&self, relation: Relation, delta: i64) -> SagaOutcome {
        let mut counters = Vec::new();
        let mut partial_failures = Vec::new();

        for key in relation.counter_effects() {
            match self.ledger.apply_delta(&key, delta).await {
                Ok(outcome) => {
                    if outcome.clamped_to_zero {
                        // The counter had drifted below the row count.
                        self.queue_for_audit(&key).await;
                    }
                    counters.push(outcome);
                }
                Err(err) => {
                    tracing::warn!(
                        counter = %key,
                        delta,
                        error = %err,
                        "counter delta failed after relationship write; queued for reconciliation"
                    );
                    self.queue_for_audit(&key).await;
                    partial_failures.push(PartialFailure {
                        key,
                        delta,
                        reason: err.to_string(),
                    });
                }
            }
        }

        SagaOutcome {
            relation,
            counters,
            partial_failures,
        }
    }

    async fn queue_for_audit(&self, key: &CounterKey) {
        if let Err(err) = self.queue.enqueue(key).await {
            tracing::error!(
                counter = %key,
                error = %err,
                "failed to queue counter for reconciliation"
            );
        }
    }
}
