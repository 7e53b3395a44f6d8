//! Hub enrichment: attaches reviews (with author names) and the caller's
//! favorite flag. Lookups are batched across the whole hub set and a failed
//! lookup degrades the response instead of failing it.

use std::collections::{HashMap, HashSet};

use tracing::warn;
use uuid::Uuid;

use super::repo_types::{Hub, HubView};
use crate::{
    favorites::Favorite,
    reviews::{Review, ReviewView},
    state::AppState,
    store::Filter,
    users,
};

pub const UNKNOWN_USER: &str = "Unknown User";

/// Resolves author names for `reviews` with one users lookup.
pub async fn review_views(state: &AppState, reviews: Vec<Review>) -> Vec<ReviewView> {
    let names = match users::display_names(state, reviews.iter().map(|r| r.user_id)).await {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "reviewer lookup failed; using placeholder names");
            HashMap::new()
        }
    };
    reviews
        .into_iter()
        .map(|review| {
            let name = names
                .get(&review.user_id)
                .filter(|n| !n.is_empty())
                .cloned()
                .unwrap_or_else(|| UNKNOWN_USER.to_owned());
            ReviewView::new(review, name)
        })
        .collect()
}

async fn reviews_by_hub(state: &AppState, hub_ids: &[Uuid]) -> HashMap<Uuid, Vec<ReviewView>> {
    let reviews = match state
        .repo::<Review>()
        .find(&Filter::new().any_of("hub_id", hub_ids))
        .await
    {
        Ok(reviews) => reviews,
        Err(e) => {
            warn!(error = %e, hubs = hub_ids.len(), "review lookup failed; omitting reviews");
            return HashMap::new();
        }
    };

    let mut grouped: HashMap<Uuid, Vec<ReviewView>> = HashMap::new();
    for view in review_views(state, reviews).await {
        grouped.entry(view.hub_id).or_default().push(view);
    }
    grouped
}

async fn favorited(state: &AppState, caller: Option<Uuid>, hub_ids: &[Uuid]) -> HashSet<Uuid> {
    let Some(user_id) = caller else {
        return HashSet::new();
    };
    let filter = Filter::new()
        .eq("user_id", user_id)
        .any_of("hub_id", hub_ids);
    match state.repo::<Favorite>().find(&filter).await {
        Ok(favs) => favs.into_iter().map(|f| f.hub_id).collect(),
        Err(e) => {
            warn!(error = %e, %user_id, "favorite lookup failed; reporting none");
            HashSet::new()
        }
    }
}

pub async fn enrich(state: &AppState, hubs: Vec<Hub>, caller: Option<Uuid>) -> Vec<HubView> {
    if hubs.is_empty() {
        return Vec::new();
    }
    let hub_ids: Vec<Uuid> = hubs.iter().map(|h| h.id).collect();
    let mut reviews = reviews_by_hub(state, &hub_ids).await;
    let favorites = favorited(state, caller, &hub_ids).await;

    hubs.into_iter()
        .map(|hub| {
            let is_favorite = favorites.contains(&hub.id);
            let reviews = reviews.remove(&hub.id).unwrap_or_default();
            HubView::new(hub, is_favorite, reviews)
        })
        .collect()
}

pub async fn enrich_one(state: &AppState, hub: Hub, caller: Option<Uuid>) -> HubView {
    let mut views = enrich(state, vec![hub.clone()], caller).await;
    views.pop().unwrap_or_else(|| HubView::new(hub, false, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        repository::Repository,
        store::{Collection, DocumentStore, SetFields, StoreError},
        testing::{test_config, FakeAssets, TestApp},
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use std::sync::Arc;
    use time::OffsetDateTime;

    fn hub(title: &str) -> Hub {
        let now = OffsetDateTime::now_utc();
        Hub {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            title: title.into(),
            description: None,
            coordinates: Default::default(),
            location: None,
            rating: None,
            images: vec![],
            created_at: now,
            updated_at: now,
        }
    }

    fn review(hub_id: Uuid, user_id: Uuid, rating: u8) -> Review {
        let now = OffsetDateTime::now_utc();
        Review {
            id: Uuid::now_v7(),
            user_id,
            hub_id,
            rating,
            comment: Some("nice".into()),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn attaches_names_flags_and_sentinels() {
        let app = TestApp::new();
        let alice = app.seed_user("Alice").await;
        let ghost = Uuid::now_v7();
        let (a, b) = (hub("A"), hub("B"));
        let reviews: Repository<Review> = app.state.repo();
        reviews.insert(&review(a.id, alice, 5)).await.unwrap();
        reviews.insert(&review(a.id, ghost, 2)).await.unwrap();
        app.state
            .repo::<Favorite>()
            .insert(&Favorite {
                id: Uuid::now_v7(),
                user_id: alice,
                hub_id: b.id,
                created_at: OffsetDateTime::now_utc(),
            })
            .await
            .unwrap();

        let views = enrich(&app.state, vec![a.clone(), b.clone()], Some(alice)).await;
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, a.id);
        let names: Vec<_> = views[0].reviews.iter().map(|r| r.user_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", UNKNOWN_USER]);
        assert!(!views[0].is_favorite);
        assert!(views[1].reviews.is_empty());
        assert!(views[1].is_favorite);

        let anonymous = enrich(&app.state, vec![b], None).await;
        assert!(!anonymous[0].is_favorite);
    }

    /// Serves hubs but fails every other collection.
    struct FlakyStore {
        inner: crate::store::MemoryDocumentStore,
    }

    #[async_trait]
    impl DocumentStore for FlakyStore {
        async fn find(&self, c: Collection, f: &Filter) -> Result<Vec<Value>, StoreError> {
            if c == Collection::Hubs {
                return self.inner.find(c, f).await;
            }
            Err(StoreError::Timeout(std::time::Duration::from_secs(5)))
        }
        async fn find_one(&self, c: Collection, f: &Filter) -> Result<Option<Value>, StoreError> {
            self.inner.find_one(c, f).await
        }
        async fn insert(&self, c: Collection, id: Uuid, doc: Value) -> Result<Uuid, StoreError> {
            self.inner.insert(c, id, doc).await
        }
        async fn update(&self, c: Collection, f: &Filter, s: &SetFields) -> Result<u64, StoreError> {
            self.inner.update(c, f, s).await
        }
        async fn delete(&self, c: Collection, f: &Filter) -> Result<u64, StoreError> {
            self.inner.delete(c, f).await
        }
    }

    #[tokio::test]
    async fn failed_lookups_degrade_instead_of_failing() {
        let state = AppState::from_parts(
            Arc::new(test_config()),
            Arc::new(FlakyStore {
                inner: Default::default(),
            }),
            Arc::new(FakeAssets::default()),
        );
        let views = enrich(&state, vec![hub("A")], Some(Uuid::now_v7())).await;
        assert_eq!(views.len(), 1);
        assert!(views[0].reviews.is_empty());
        assert!(!views[0].is_favorite);

        let named = review_views(&state, vec![review(Uuid::now_v7(), Uuid::now_v7(), 4)]).await;
        assert_eq!(named[0].user_name, UNKNOWN_USER);
    }
}
