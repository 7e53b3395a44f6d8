use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{freshness::Versioned, repository::Document, store::Collection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionStatus {
    Pending,
    Confirmed,
    Failed,
    Reconciled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    pub id: Uuid,
    pub event_id: Uuid,
    pub contributor_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contributor_contact: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub method: String, // MPESA, STRIPE, CASH, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    pub status: ContributionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Document for Contribution {
    const COLLECTION: Collection = Collection::Contributions;
    const NAME: &'static str = "contribution";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for Contribution {
    fn id(&self) -> Uuid {
        self.id
    }

    fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}
