use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::null_as_default;

pub mod aggregate;
pub mod client;
pub mod endpoints;
pub mod manager;
pub use endpoints::*;

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub donor_name: Option<String>,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub campaign: Option<DonationCampaign>,
}

impl Donation {
    pub fn amount_or_zero(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }

    pub fn donation_type(&self) -> DonationType {
        match self.referral_code.as_deref() {
            Some(code) if !code.is_empty() => DonationType::Referral,
            _ => DonationType::Direct,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationCampaign {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub goal_amount: Option<f64>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum DonationType {
    Referral,
    Direct,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_amount: f64,
}

/// Multi-field donation filter. Text fields match case-insensitive
/// substrings; empty or absent fields match everything.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct DonationFilter {
    pub donor_name: Option<String>,
    pub campaign_title: Option<String>,
    pub description: Option<String>,
    pub referral_code: Option<String>,
    #[serde(rename = "type")]
    pub donation_type: Option<DonationType>,
    pub date: Option<NaiveDate>,
}

impl DonationFilter {
    pub fn matches(&self, donation: &Donation) -> bool {
        let campaign = donation.campaign.as_ref();

        contains(&self.donor_name, donation.donor_name.as_deref())
            && contains(
                &self.campaign_title,
                campaign.and_then(|c| c.title.as_deref()),
            )
            && contains(
                &self.description,
                campaign.and_then(|c| c.description.as_deref()),
            )
            && contains(&self.referral_code, donation.referral_code.as_deref())
            && self
                .donation_type
                .map_or(true, |t| t == donation.donation_type())
            && self
                .date
                .map_or(true, |date| donation.date.map(|d| d.date_naive()) == Some(date))
    }
}

pub(crate) fn contains(needle: &Option<String>, haystack: Option<&str>) -> bool {
    match needle.as_deref() {
        None | Some("") => true,
        Some(needle) => haystack.map_or(false, |haystack| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }),
    }
}
