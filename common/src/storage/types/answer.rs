use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// One retrieved source backing a generated answer, ordered by rank.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceExcerpt {
    pub text: String,
    pub score: f64,
}

/// Exactly two vote directions exist; the wire values are "up" and "down".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    fn counter_field(self) -> &'static str {
        match self {
            Self::Up => "upvotes",
            Self::Down => "downvotes",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteCounts {
    pub upvotes: i64,
    pub downvotes: i64,
}

stored_object!(Answer, "answer", {
    prompt: String,
    answer: String,
    sources: Vec<SourceExcerpt>,
    confidence: f64,
    document_ids: Vec<String>,
    upvotes: i64,
    downvotes: i64
});

impl Answer {
    /// Both counters start at zero; they are the only fields that ever change
    /// after creation.
    pub fn new(
        prompt: String,
        answer: String,
        sources: Vec<SourceExcerpt>,
        confidence: f64,
        document_ids: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            prompt,
            answer,
            sources,
            confidence,
            document_ids,
            upvotes: 0,
            downvotes: 0,
        }
    }

    pub fn counts(&self) -> VoteCounts {
        VoteCounts {
            upvotes: self.upvotes,
            downvotes: self.downvotes,
        }
    }

    /// Increments exactly one counter and returns the post-increment record.
    ///
    /// The increment is a single UPDATE statement, so SurrealDB serializes it
    /// against concurrent votes on the same record. Under contention the
    /// engine can still reject a transaction at commit time; those rejections
    /// happen before any write lands, so retrying keeps the counter exact.
    pub async fn record_vote(
        db: &SurrealDbClient,
        answer_id: &str,
        direction: VoteDirection,
    ) -> Result<Self, AppError> {
        let strategy = ExponentialBackoff::from_millis(10).map(jitter).take(4);
        let updated = Retry::spawn(strategy, || Self::apply_vote(db, answer_id, direction)).await?;

        updated.ok_or_else(|| AppError::NotFound(format!("answer {answer_id} not found")))
    }

    async fn apply_vote(
        db: &SurrealDbClient,
        answer_id: &str,
        direction: VoteDirection,
    ) -> Result<Option<Self>, surrealdb::Error> {
        db.client
            .query(format!(
                "UPDATE type::thing('answer', $answer_id) SET {} += 1, updated_at = time::now() RETURN AFTER",
                direction.counter_field()
            ))
            .bind(("answer_id", answer_id.to_string()))
            .await?
            .take(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::Arc;

    fn sample_answer() -> Answer {
        Answer::new(
            "What color is the sky?".to_string(),
            "The sky is blue.".to_string(),
            vec![SourceExcerpt {
                text: "The sky is blue.".to_string(),
                score: 0.92,
            }],
            0.92,
            vec!["doc-1".to_string()],
        )
    }

    async fn test_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("Failed to start in-memory surrealdb")
    }

    #[test]
    fn new_answer_starts_with_zero_counters() {
        let answer = sample_answer();
        assert_eq!(answer.upvotes, 0);
        assert_eq!(answer.downvotes, 0);
    }

    #[tokio::test]
    async fn record_vote_increments_one_counter() {
        let db = test_db().await;
        let answer = sample_answer();
        db.store_item(answer.clone())
            .await
            .expect("Failed to store answer");

        let updated = Answer::record_vote(&db, &answer.id, VoteDirection::Up)
            .await
            .expect("Vote failed");
        assert_eq!(updated.upvotes, 1);
        assert_eq!(updated.downvotes, 0);

        let updated = Answer::record_vote(&db, &answer.id, VoteDirection::Down)
            .await
            .expect("Vote failed");
        assert_eq!(updated.upvotes, 1);
        assert_eq!(updated.downvotes, 1);
    }

    #[tokio::test]
    async fn record_vote_on_unknown_answer_is_not_found() {
        let db = test_db().await;

        let result = Answer::record_vote(&db, "missing", VoteDirection::Up).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn concurrent_votes_are_not_lost() {
        let db = Arc::new(test_db().await);
        let answer = sample_answer();
        db.store_item(answer.clone())
            .await
            .expect("Failed to store answer");

        let votes: i64 = 16;
        let tasks: Vec<_> = (0..votes)
            .map(|_| {
                let db = Arc::clone(&db);
                let id = answer.id.clone();
                tokio::spawn(
                    async move { Answer::record_vote(&db, &id, VoteDirection::Up).await },
                )
            })
            .collect();

        for result in join_all(tasks).await {
            result.expect("task panicked").expect("vote failed");
        }

        let stored = db
            .get_item::<Answer>(&answer.id)
            .await
            .expect("Failed to fetch answer")
            .expect("Answer missing");
        assert_eq!(stored.upvotes, votes);
        assert_eq!(stored.downvotes, 0);
    }

    #[tokio::test]
    async fn votes_leave_immutable_fields_untouched() {
        let db = test_db().await;
        let answer = sample_answer();
        db.store_item(answer.clone())
            .await
            .expect("Failed to store answer");

        for _ in 0..3 {
            Answer::record_vote(&db, &answer.id, VoteDirection::Up)
                .await
                .expect("Vote failed");
        }

        let stored = db
            .get_item::<Answer>(&answer.id)
            .await
            .expect("Failed to fetch answer")
            .expect("Answer missing");
        assert_eq!(stored.prompt, answer.prompt);
        assert_eq!(stored.answer, answer.answer);
        assert_eq!(stored.sources, answer.sources);
        assert_eq!(stored.document_ids, answer.document_ids);
        assert_eq!(stored.upvotes, 3);
    }
}
