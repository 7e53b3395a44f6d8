//! Sparse partial updates.
//!
//! An [`UpdateSet`] always stages `updated_at`; every other field is staged
//! only when the caller supplied it. Presence is tracked with `Option`, so an
//! explicit zero or empty string is a real update.

use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    repository::{Document, Repository},
    store::{Filter, SetFields},
};

#[derive(Serialize)]
#[serde(transparent)]
struct Timestamp(#[serde(with = "time::serde::rfc3339")] OffsetDateTime);

#[derive(Debug, Clone)]
pub struct UpdateSet {
    fields: SetFields,
}

fn encode<V: Serialize>(path: &str, value: V) -> AppResult<Value> {
    serde_json::to_value(value).map_err(|_| AppError::invalid(format!("invalid {}", path)))
}

impl UpdateSet {
    pub fn new(now: OffsetDateTime) -> AppResult<Self> {
        let mut fields = SetFields::default();
        fields.push("updated_at", encode("updated_at", Timestamp(now))?);
        Ok(Self { fields })
    }

    /// Stages `value` under its persisted `path` when present.
    pub fn stage<V: Serialize>(&mut self, path: &str, value: Option<V>) -> AppResult<&mut Self> {
        if let Some(value) = value {
            self.fields.push(path, encode(path, value)?);
        }
        Ok(self)
    }

    pub fn stage_timestamp(
        &mut self,
        path: &str,
        value: Option<OffsetDateTime>,
    ) -> AppResult<&mut Self> {
        self.stage(path, value.map(Timestamp))
    }

    /// Image lists are replaced by `retained ++ uploaded`. Supplying neither
    /// leaves the stored list untouched.
    pub fn stage_images(
        &mut self,
        path: &str,
        retained: Option<Vec<String>>,
        uploaded: Vec<String>,
    ) -> AppResult<&mut Self> {
        self.stage(path, merge_images(retained, uploaded))
    }

    pub fn has_changes(&self) -> bool {
        self.fields.len() > 1
    }

    pub fn into_fields(self) -> AppResult<SetFields> {
        if !self.has_changes() {
            return Err(AppError::NoFieldsToUpdate);
        }
        Ok(self.fields)
    }
}

pub fn merge_images(retained: Option<Vec<String>>, uploaded: Vec<String>) -> Option<Vec<String>> {
    if retained.is_none() && uploaded.is_empty() {
        return None;
    }
    let mut images = retained.unwrap_or_default();
    images.extend(uploaded);
    Some(images)
}

/// A sparse input that knows how to stage itself.
pub trait Patch: Sized {
    fn stage_into(self, set: &mut UpdateSet) -> AppResult<()>;

    /// Stages every present field on top of `updated_at = now`. Fails with
    /// [`AppError::NoFieldsToUpdate`] when nothing else was staged.
    fn into_fields(self, now: OffsetDateTime) -> AppResult<SetFields> {
        let mut set = UpdateSet::new(now)?;
        self.stage_into(&mut set)?;
        set.into_fields()
    }
}

/// Applies `fields` as one field-level write and re-reads the document.
pub async fn apply<T: Document>(
    repo: &Repository<T>,
    id: Uuid,
    guard: Option<Filter>,
    fields: SetFields,
) -> AppResult<T> {
    let guarded = guard.is_some();
    let matched = repo.update(id, guard, &fields).await?;
    if matched == 0 {
        return Err(if guarded {
            AppError::PreconditionFailed
        } else {
            AppError::not_found(format!("{} not found", T::NAME))
        });
    }
    debug!(%id, fields = fields.len(), collection = T::COLLECTION.name(), "update applied");
    repo.find_one(id, None)
        .await?
        .ok_or_else(|| AppError::not_found(format!("{} not found", T::NAME)))
}

/// Builds the update from `patch` and applies it with [`apply`].
pub async fn apply_patch<T: Document, P: Patch>(
    repo: &Repository<T>,
    id: Uuid,
    guard: Option<Filter>,
    patch: P,
) -> AppResult<T> {
    let fields = patch.into_fields(OffsetDateTime::now_utc())?;
    apply(repo, id, guard, fields).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn absent_fields_are_not_staged() {
        let mut set = UpdateSet::new(datetime!(2024-01-01 0:00 UTC)).unwrap();
        set.stage::<String>("title", None)
            .unwrap()
            .stage("amount", Some(0.0))
            .unwrap()
            .stage("description", Some(""))
            .unwrap();
        let fields = set.into_fields().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields.get("amount"), Some(&json!(0.0)));
        assert_eq!(fields.get("description"), Some(&json!("")));
        assert_eq!(fields.get("updated_at"), Some(&json!("2024-01-01T00:00:00Z")));
        assert!(fields.get("title").is_none());
    }

    #[test]
    fn only_updated_at_is_rejected() {
        let set = UpdateSet::new(OffsetDateTime::now_utc()).unwrap();
        assert!(!set.has_changes());
        assert!(matches!(set.into_fields(), Err(AppError::NoFieldsToUpdate)));
    }

    #[test]
    fn nested_axes_are_staged_independently() {
        let mut set = UpdateSet::new(OffsetDateTime::now_utc()).unwrap();
        set.stage("coordinates.lat", Some(-1.29)).unwrap();
        set.stage::<f64>("coordinates.lng", None).unwrap();
        let fields = set.into_fields().unwrap();
        assert_eq!(fields.get("coordinates.lat"), Some(&json!(-1.29)));
        assert!(fields.get("coordinates.lng").is_none());
        assert!(fields.get("coordinates").is_none());
    }

    #[test]
    fn images_append_to_retained_list() {
        assert_eq!(
            merge_images(Some(vec!["B".into()]), vec!["C".into()]),
            Some(vec!["B".to_string(), "C".to_string()])
        );
        assert_eq!(merge_images(None, vec!["C".into()]), Some(vec!["C".to_string()]));
        assert_eq!(merge_images(Some(vec![]), vec![]), Some(vec![]));
        assert_eq!(merge_images(None, vec![]), None);
    }

    #[test]
    fn untouched_images_leave_set_empty() {
        let mut set = UpdateSet::new(OffsetDateTime::now_utc()).unwrap();
        set.stage_images("images", None, vec![]).unwrap();
        assert!(!set.has_changes());
    }
}
