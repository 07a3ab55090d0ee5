//! Headline figures for the moderator dashboard and the intern's own
//! progress toward their fundraising goal.

use serde::{Deserialize, Serialize};

pub mod endpoints;
pub mod manager;
pub use endpoints::*;

#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct DashboardStats {
    pub campaign_count: usize,
    pub intern_count: usize,
    pub total_donated: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct InternProgress {
    pub name: String,
    pub email: String,
    pub referral_code: Option<String>,
    pub total_raised: f64,
    pub goal: f64,
    pub percentage: f64,
    pub stipend_amount: f64,
}
