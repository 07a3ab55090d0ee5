use actix_web::http::Method;
use async_trait::async_trait;
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::{parse_records, HttpPortalApi};
use crate::error::Error;
use crate::session::Session;

use super::{Campaign, CampaignDraft, CampaignId};

#[async_trait(?Send)]
pub trait CampaignClient {
    async fn fetch_campaigns(&self, session: &Session) -> Result<Vec<Campaign>, Error>;
    async fn create_campaign(
        &self,
        session: &Session,
        draft: &CampaignDraft,
    ) -> Result<Campaign, Error>;
    async fn update_campaign(
        &self,
        session: &Session,
        campaign_id: &CampaignId,
        draft: &CampaignDraft,
    ) -> Result<Campaign, Error>;
    /// Pushes the campaign's end date back by `extension`.
    async fn extend_campaign(
        &self,
        session: &Session,
        campaign_id: &CampaignId,
        extension: Duration,
    ) -> Result<(), Error>;
    async fn delete_campaign(&self, session: &Session, campaign_id: &CampaignId)
        -> Result<(), Error>;
}

#[derive(Deserialize)]
struct CampaignsBody {
    #[serde(default)]
    campaigns: Vec<Value>,
}

#[derive(Deserialize)]
struct SingleCampaignBody {
    campaign: Campaign,
}

#[async_trait(?Send)]
impl CampaignClient for HttpPortalApi {
    #[tracing::instrument(skip(self))]
    async fn fetch_campaigns(&self, session: &Session) -> Result<Vec<Campaign>, Error> {
        let body: CampaignsBody = self.get(session, "/api/campaign").await?;

        Ok(parse_records(body.campaigns, "campaign"))
    }

    #[tracing::instrument(skip(self))]
    async fn create_campaign(
        &self,
        session: &Session,
        draft: &CampaignDraft,
    ) -> Result<Campaign, Error> {
        let body: SingleCampaignBody = self
            .send(session, Method::POST, "/api/campaign", draft)
            .await?;

        Ok(body.campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn update_campaign(
        &self,
        session: &Session,
        campaign_id: &CampaignId,
        draft: &CampaignDraft,
    ) -> Result<Campaign, Error> {
        let path = format!("/api/campaign/{}", campaign_id);
        let body: SingleCampaignBody = self.send(session, Method::PUT, &path, draft).await?;

        Ok(body.campaign)
    }

    #[tracing::instrument(skip(self))]
    async fn extend_campaign(
        &self,
        session: &Session,
        campaign_id: &CampaignId,
        extension: Duration,
    ) -> Result<(), Error> {
        let path = format!("/api/campaign/{}/extend", campaign_id);
        let payload = json!({ "duration": extension.num_milliseconds() });

        self.execute(session, Method::PUT, &path, Some(&payload)).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_campaign(
        &self,
        session: &Session,
        campaign_id: &CampaignId,
    ) -> Result<(), Error> {
        let path = format!("/api/campaign/{}", campaign_id);

        self.execute(session, Method::DELETE, &path, None).await
    }
}
