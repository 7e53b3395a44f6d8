use std::str::FromStr;

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Parses a path or body identifier, e.g. `parse_id(raw, "hub")`.
pub fn parse_id(raw: &str, noun: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(format!("invalid {} id", noun)))
}

/// Parses an optional float field, rejecting `NaN` and infinities, which
/// would otherwise serialize as `null`.
pub fn finite_number(raw: Option<String>, name: &str) -> AppResult<Option<f64>> {
    raw.map(|v| {
        v.parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| AppError::invalid(format!("invalid {}", name)))
    })
    .transpose()
}

/// One file part of a multipart body.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: Option<String>,
    pub content_type: String,
    pub body: Bytes,
}

/// A fully buffered multipart body. Text parts keep their order so repeated
/// keys (`images`, `images[]`) read back as lists.
#[derive(Debug, Default)]
pub struct FormData {
    fields: Vec<(String, String)>,
    files: Vec<(String, UploadItem)>,
}

fn normalise(name: &str) -> &str {
    name.strip_suffix("[]").unwrap_or(name)
}

impl FormData {
    pub async fn read(mut mp: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = mp.next_field().await? {
            let Some(name) = field.name().map(|n| normalise(n).to_owned()) else {
                continue;
            };
            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_owned);
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_owned();
                let body = field.bytes().await?;
                if body.is_empty() {
                    continue;
                }
                form.files.push((
                    name,
                    UploadItem {
                        file_name,
                        content_type,
                        body,
                    },
                ));
            } else {
                let value = field.text().await?;
                form.fields.push((name, value));
            }
        }
        Ok(form)
    }

    pub fn has(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    /// Last value of a text field. A present but blank value is `Some("")`.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.trim().to_owned())
    }

    /// Every non-blank value of a repeated field, `None` if the key never
    /// appeared at all.
    pub fn texts(&self, name: &str) -> Option<Vec<String>> {
        if !self.has(name) {
            return None;
        }
        Some(
            self.fields
                .iter()
                .filter(|(n, _)| n == name)
                .map(|(_, v)| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    pub fn required_text(&self, name: &str) -> AppResult<String> {
        self.text(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::invalid(format!("{} is required", name)))
    }

    /// Parses a typed field; blank values count as absent.
    pub fn parse<T: FromStr>(&self, name: &str) -> AppResult<Option<T>> {
        self.text(name)
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| AppError::invalid(format!("invalid {}", name)))
            })
            .transpose()
    }

    /// Finite float field; blank values count as absent.
    pub fn number(&self, name: &str) -> AppResult<Option<f64>> {
        finite_number(self.text(name).filter(|v| !v.is_empty()), name)
    }

    pub fn take_files(&mut self, name: &str) -> Vec<UploadItem> {
        let (taken, rest) = std::mem::take(&mut self.files)
            .into_iter()
            .partition(|(n, _)| n == name);
        self.files = rest;
        taken.into_iter().map(|(_, item)| item).collect()
    }

    #[cfg(test)]
    pub fn from_pairs(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(n, v)| (normalise(n).to_owned(), (*v).to_owned()))
                .collect(),
            files: Vec::new(),
        }
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormData
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mp = Multipart::from_request(req, state).await?;
        Self::read(mp).await
    }
}
