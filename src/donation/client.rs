use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::api::{parse_records, HttpPortalApi};
use crate::error::Error;
use crate::session::Session;
use crate::user::ReferralCode;

use super::{Donation, LeaderboardEntry};

#[async_trait(?Send)]
pub trait DonationClient {
    /// Donations visible to the session's user.
    async fn fetch_donations(&self, session: &Session) -> Result<Vec<Donation>, Error>;
    async fn fetch_donations_by_referral(
        &self,
        session: &Session,
        referral_code: &ReferralCode,
    ) -> Result<Vec<Donation>, Error>;
    async fn fetch_leaderboard(&self, session: &Session) -> Result<Vec<LeaderboardEntry>, Error>;
}

#[derive(Deserialize)]
struct DonationsBody {
    #[serde(default)]
    donations: Vec<Value>,
}

#[derive(Deserialize)]
struct LeaderboardBody {
    #[serde(default)]
    leaderboard: Vec<Value>,
}

#[async_trait(?Send)]
impl DonationClient for HttpPortalApi {
    #[tracing::instrument(skip(self))]
    async fn fetch_donations(&self, session: &Session) -> Result<Vec<Donation>, Error> {
        let body: DonationsBody = self.get(session, "/api/donations").await?;

        Ok(parse_records(body.donations, "donation"))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_donations_by_referral(
        &self,
        session: &Session,
        referral_code: &ReferralCode,
    ) -> Result<Vec<Donation>, Error> {
        // referral codes are alphanumeric, so safe to splice into the path
        let path = format!("/api/donations/by-referral/{}", referral_code.as_str());
        let body: DonationsBody = self.get(session, &path).await?;

        Ok(parse_records(body.donations, "donation"))
    }

    #[tracing::instrument(skip(self))]
    async fn fetch_leaderboard(&self, session: &Session) -> Result<Vec<LeaderboardEntry>, Error> {
        let body: LeaderboardBody = self.get(session, "/api/donations/leaderboard").await?;

        Ok(parse_records(body.leaderboard, "leaderboard entry"))
    }
}
