use serde::{Deserialize, Serialize};

use super::repo_types::HubView;
use crate::{
    error::{AppError, AppResult},
    form::{finite_number, FormData},
    merge::{Patch, UpdateSet},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub owner: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HubUpdated {
    pub message: &'static str,
    pub hub: HubView,
}

/// Raw multipart fields of a PATCH.
#[derive(Debug, Default)]
pub struct HubChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub location_name: Option<String>,
    pub rating: Option<String>,
    pub retained_images: Option<Vec<String>>,
}

impl HubChanges {
    pub fn from_form(form: &FormData) -> Self {
        let non_blank = |name: &str| form.text(name).filter(|v| !v.is_empty());
        Self {
            title: form.text("title"),
            description: form.text("description"),
            lat: non_blank("lat"),
            lng: non_blank("lng"),
            location_name: form.text("location_name"),
            rating: non_blank("rating"),
            retained_images: form.texts("images"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.lat.is_none()
            && self.lng.is_none()
            && self.location_name.is_none()
            && self.rating.is_none()
            && self.retained_images.is_none()
    }

    pub fn parse(self) -> AppResult<HubPatch> {
        if self.title.as_deref() == Some("") {
            return Err(AppError::invalid("title cannot be empty"));
        }
        Ok(HubPatch {
            lat: finite_number(self.lat, "lat")?,
            lng: finite_number(self.lng, "lng")?,
            rating: finite_number(self.rating, "rating")?,
            title: self.title,
            description: self.description,
            location_name: self.location_name,
            retained_images: self.retained_images,
            uploaded_images: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
pub struct HubPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub location_name: Option<String>,
    pub rating: Option<f64>,
    pub retained_images: Option<Vec<String>>,
    pub uploaded_images: Vec<String>,
}

impl Patch for HubPatch {
    fn stage_into(self, set: &mut UpdateSet) -> AppResult<()> {
        set.stage("title", self.title)?
            .stage("description", self.description)?
            .stage("coordinates.lat", self.lat)?
            .stage("coordinates.lng", self.lng)?
            .stage("location", self.location_name)?
            .stage("rating", self.rating)?
            .stage_images("images", self.retained_images, self.uploaded_images)?;
        Ok(())
    }
}
