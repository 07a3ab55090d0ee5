use actix_web::get;
use actix_web::web::{Data, Json, Query};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PortalApi;
use crate::error::Error;
use crate::session::Session;

use super::aggregate::DonationSummary;
use super::{manager, Donation, DonationFilter, DonationType, LeaderboardEntry};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct DonationBody {
    pub amount: f64,
    pub donor_name: Option<String>,
    pub referral_code: Option<String>,
    #[serde(rename = "type")]
    pub donation_type: DonationType,
    pub date: Option<DateTime<Utc>>,
    pub campaign_title: Option<String>,
    pub campaign_description: Option<String>,
}

impl DonationBody {
    pub fn render(donation: Donation) -> DonationBody {
        let donation_type = donation.donation_type();
        let campaign = donation.campaign.unwrap_or_default();

        DonationBody {
            amount: donation.amount.unwrap_or(0.0),
            donor_name: donation.donor_name,
            referral_code: donation.referral_code.filter(|code| !code.is_empty()),
            donation_type,
            date: donation.date,
            campaign_title: campaign.title,
            campaign_description: campaign.description,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LeaderboardEntryBody {
    pub rank: usize,
    pub name: String,
    pub total_amount: f64,
}

impl LeaderboardEntryBody {
    pub fn render(rank: usize, entry: LeaderboardEntry) -> LeaderboardEntryBody {
        LeaderboardEntryBody {
            rank,
            name: entry
                .name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| "Anonymous".to_string()),
            total_amount: entry.total_amount,
        }
    }
}

#[get("/donations")]
#[tracing::instrument(skip(api))]
pub async fn get_donations(
    api: Data<dyn PortalApi>,
    session: Session,
    query: Query<DonationFilter>,
) -> Result<Json<Vec<DonationBody>>, Error> {
    let filter = query.into_inner();

    let donations = manager::get_donations(&**api, &session, &filter).await?;

    Ok(Json(donations.into_iter().map(DonationBody::render).collect()))
}

#[get("/donations/summary")]
#[tracing::instrument(skip(api))]
pub async fn get_donation_summary(
    api: Data<dyn PortalApi>,
    session: Session,
) -> Result<Json<DonationSummary>, Error> {
    let summary = manager::get_donation_summary(&**api, &session).await?;

    Ok(Json(summary))
}

#[get("/donations/leaderboard")]
#[tracing::instrument(skip(api))]
pub async fn get_leaderboard(
    api: Data<dyn PortalApi>,
    session: Session,
) -> Result<Json<Vec<LeaderboardEntryBody>>, Error> {
    let leaderboard = manager::get_leaderboard(&**api, &session).await?;

    let body = leaderboard
        .into_iter()
        .enumerate()
        .map(|(index, entry)| LeaderboardEntryBody::render(index + 1, entry))
        .collect();

    Ok(Json(body))
}
