use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{repo_types::{Event, EventStatus}, services::parse_deadline};
use crate::{
    error::{AppError, AppResult},
    form::{finite_number, FormData},
    merge::{Patch, UpdateSet},
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EventUpdated {
    pub message: &'static str,
    pub event: Event,
}

/// Raw multipart fields of a PATCH, before any value is parsed.
#[derive(Debug, Default)]
pub struct EventChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub target_amount: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<String>,
    pub retained_images: Option<Vec<String>>,
}

impl EventChanges {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            title: form.text("title"),
            description: form.text("description"),
            location: form.text("location"),
            target_amount: form.text("target_amount").filter(|v| !v.is_empty()),
            deadline: form.text("deadline").filter(|v| !v.is_empty()),
            status: form.text("status").filter(|v| !v.is_empty()),
            retained_images: form.texts("images"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.location.is_none()
            && self.target_amount.is_none()
            && self.deadline.is_none()
            && self.status.is_none()
            && self.retained_images.is_none()
    }

    pub fn parse(self) -> AppResult<EventPatch> {
        let title = match self.title {
            Some(t) if t.is_empty() => return Err(AppError::invalid("title cannot be empty")),
            other => other,
        };
        let target_amount = finite_number(self.target_amount, "target_amount")?;
        let deadline = self.deadline.as_deref().map(parse_deadline).transpose()?;
        let status = self
            .status
            .map(|s| s.parse::<EventStatus>().map_err(|_| AppError::invalid("invalid status")))
            .transpose()?;
        Ok(EventPatch {
            title,
            description: self.description,
            location: self.location,
            target_amount,
            deadline,
            status,
            retained_images: self.retained_images,
            uploaded_images: Vec::new(),
        })
    }
}

#[derive(Debug, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub target_amount: Option<f64>,
    pub deadline: Option<OffsetDateTime>,
    pub status: Option<EventStatus>,
    pub retained_images: Option<Vec<String>>,
    pub uploaded_images: Vec<String>,
}

impl Patch for EventPatch {
    fn stage_into(self, set: &mut UpdateSet) -> AppResult<()> {
        set.stage("title", self.title)?
            .stage("description", self.description)?
            .stage("location", self.location)?
            .stage("target_amount", self.target_amount)?
            .stage_timestamp("deadline", self.deadline)?
            .stage("status", self.status)?
            .stage_images("images", self.retained_images, self.uploaded_images)?;
        Ok(())
    }
}
