//! Read-only view of the `users` collection, which the identity service owns.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    repository::Document,
    state::AppState,
    store::{Collection, Filter, StoreError},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Document for User {
    const COLLECTION: Collection = Collection::Users;
    const NAME: &'static str = "user";

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Display names for `ids` in a single lookup. Unknown ids are simply absent.
pub async fn display_names(
    state: &AppState,
    ids: impl IntoIterator<Item = Uuid>,
) -> Result<HashMap<Uuid, String>, StoreError> {
    let mut ids: Vec<Uuid> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let users = state
        .repo::<User>()
        .find(&Filter::new().any_of("id", ids))
        .await?;
    Ok(users.into_iter().map(|u| (u.id, u.name)).collect())
}
