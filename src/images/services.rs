use std::{sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    error::{AppError, AppResult},
    form::UploadItem,
    state::AppState,
    storage::{AssetError, AssetStore},
};

lazy_static! {
    static ref VERSION_SEGMENT: Regex = Regex::new(r"^v\d+$").unwrap();
}

/// Recovers the asset host public-ID from a delivery URL:
/// `https://host/<prefix>/v<digits>/<public/id>.<ext>` → `public/id`.
pub fn extract_public_id(url: &str) -> Result<String, AssetError> {
    let fail = || AssetError::Extraction(url.to_owned());

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(fail)?;
    let rest = rest.split(['?', '#']).next().unwrap_or_default();
    let (host, path) = rest.split_once('/').ok_or_else(fail)?;
    if host.is_empty() {
        return Err(fail());
    }

    // The base URL may carry its own `v<digits>` segment; the version is the last one.
    let segments: Vec<&str> = path.split('/').collect();
    let version = segments
        .iter()
        .rposition(|s| VERSION_SEGMENT.is_match(s))
        .ok_or_else(fail)?;
    let tail = &segments[version + 1..];
    if tail.is_empty() || tail.iter().any(|s| s.is_empty()) {
        return Err(fail());
    }

    let joined = tail.join("/");
    let (public_id, ext) = joined.rsplit_once('.').ok_or_else(fail)?;
    if ext.is_empty() || ext.contains('/') || public_id.is_empty() || public_id.ends_with('/') {
        return Err(fail());
    }
    Ok(public_id.to_owned())
}

async fn upload_one(
    assets: &dyn AssetStore,
    folder: &str,
    item: UploadItem,
    limit: Duration,
) -> Result<String, AssetError> {
    tokio::time::timeout(limit, assets.upload(folder, item.body, &item.content_type))
        .await
        .map_err(|_| AssetError::Timeout(limit))?
}

async fn delete_one(assets: &dyn AssetStore, url: &str, limit: Duration) -> Result<(), AssetError> {
    let public_id = extract_public_id(url)?;
    tokio::time::timeout(limit, assets.delete(&public_id))
        .await
        .map_err(|_| AssetError::Timeout(limit))?
}

/// Uploads `files` one after another. On the first failure the assets already
/// uploaded by this call are deleted again before the error is returned.
pub async fn upload_images(
    state: &AppState,
    folder: &str,
    files: Vec<UploadItem>,
) -> AppResult<Vec<String>> {
    let mut urls = Vec::with_capacity(files.len());
    for item in files {
        let file_name = item.file_name.clone().unwrap_or_default();
        match upload_one(state.assets.as_ref(), folder, item, state.config.asset_upload_timeout).await {
            Ok(url) => urls.push(url),
            Err(e) => {
                warn!(error = %e, file = %file_name, uploaded = urls.len(), "image upload failed");
                discard_images(state, &urls).await;
                return Err(AppError::UploadFailed(e));
            }
        }
    }
    if !urls.is_empty() {
        info!(folder, count = urls.len(), "images uploaded");
    }
    Ok(urls)
}

/// Compensating delete for assets uploaded earlier in the same request.
pub async fn discard_images(state: &AppState, urls: &[String]) {
    for url in urls {
        if let Err(e) = delete_one(state.assets.as_ref(), url, state.config.asset_delete_timeout).await {
            warn!(error = %e, %url, "compensating image delete failed");
        }
    }
}

/// Fire-and-forget removal of a deleted resource's images.
pub fn cleanup_images(state: &AppState, urls: Vec<String>) {
    if urls.is_empty() {
        return;
    }
    let assets: Arc<dyn AssetStore> = state.assets.clone();
    let limit = state.config.asset_delete_timeout;
    tokio::spawn(async move {
        for url in urls {
            if let Err(e) = delete_one(assets.as_ref(), &url, limit).await {
                warn!(error = %e, %url, "image cleanup failed");
            }
        }
    });
}
