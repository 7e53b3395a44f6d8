use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{repository::Document, store::Collection};

/// The record's existence is the "favorited" state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hub_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Document for Favorite {
    const COLLECTION: Collection = Collection::Favorites;
    const NAME: &'static str = "favorite";

    fn id(&self) -> Uuid {
        self.id
    }
}
