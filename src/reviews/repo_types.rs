use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{freshness::Versioned, repository::Document, store::Collection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hub_id: Uuid,
    pub rating: u8, // 1..=5
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Document for Review {
    const COLLECTION: Collection = Collection::Reviews;
    const NAME: &'static str = "review";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for Review {
    fn id(&self) -> Uuid {
        self.id
    }

    fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}

/// A review as returned to clients, with the author's display name.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub hub_id: Uuid,
    pub rating: u8,
    pub comment: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ReviewView {
    pub fn new(review: Review, user_name: String) -> Self {
        Self {
            id: review.id,
            user_id: review.user_id,
            user_name,
            hub_id: review.hub_id,
            rating: review.rating,
            comment: review.comment.unwrap_or_default(),
            created_at: review.created_at,
        }
    }
}
