use serde::{Deserialize, Serialize};

use super::repo_types::{Contribution, ContributionStatus};
use crate::{
    error::AppResult,
    merge::{Patch, UpdateSet},
};

#[derive(Debug, Deserialize)]
pub struct CreateContribution {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub contributor_name: String,
    pub contributor_contact: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub method: String,
    pub payment_reference: Option<String>,
    pub receipt_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub event_id: Option<String>,
    pub status: Option<String>,
}

/// Sparse update; every absent key leaves the stored value alone.
#[derive(Debug, Default, Deserialize)]
pub struct ContributionPatch {
    pub contributor_name: Option<String>,
    pub contributor_contact: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub method: Option<String>,
    pub payment_reference: Option<String>,
    pub status: Option<ContributionStatus>,
    pub receipt_url: Option<String>,
}

impl Patch for ContributionPatch {
    fn stage_into(self, set: &mut UpdateSet) -> AppResult<()> {
        set.stage("contributor_name", self.contributor_name)?
            .stage("contributor_contact", self.contributor_contact)?
            .stage("amount", self.amount)?
            .stage("currency", self.currency)?
            .stage("method", self.method)?
            .stage("payment_reference", self.payment_reference)?
            .stage("status", self.status)?
            .stage("receipt_url", self.receipt_url)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ContributionUpdated {
    pub message: &'static str,
    pub contribution: Contribution,
}
