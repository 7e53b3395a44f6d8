use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{freshness::Versioned, repository::Document, reviews::ReviewView, store::Collection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// Stored form of a hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hub {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub coordinates: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Document for Hub {
    const COLLECTION: Collection = Collection::Hubs;
    const NAME: &'static str = "hub";

    fn id(&self) -> Uuid {
        self.id
    }
}

impl Versioned for Hub {
    fn id(&self) -> Uuid {
        self.id
    }

    fn updated_at(&self) -> OffsetDateTime {
        self.updated_at
    }
}

/// A hub as returned to clients: stored fields plus the per-caller
/// favorite flag and the enriched reviews.
#[derive(Debug, Clone, Serialize)]
pub struct HubView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub coordinates: Coordinates,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    pub images: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_favorite: bool,
    pub reviews: Vec<ReviewView>,
}

impl HubView {
    pub fn new(hub: Hub, is_favorite: bool, reviews: Vec<ReviewView>) -> Self {
        Self {
            id: hub.id,
            user_id: hub.user_id,
            title: hub.title,
            description: hub.description,
            coordinates: hub.coordinates,
            location_name: hub.location,
            rating: hub.rating,
            images: hub.images,
            created_at: hub.created_at,
            updated_at: hub.updated_at,
            is_favorite,
            reviews,
        }
    }
}
