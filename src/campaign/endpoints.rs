use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post, put};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PortalApi;
use crate::countdown::refresher::Clock;
use crate::countdown::CountdownState;
use crate::error::Error;
use crate::session::Session;
use crate::utils::SuccessBody;

use super::{manager, Campaign, CampaignDraft, CampaignId};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CampaignBody {
    pub id: CampaignId,
    pub title: String,
    pub description: Option<String>,
    pub goal_amount: f64,
    pub raised_amount: f64,
    pub funding_percentage: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub countdown: CountdownState,
    pub countdown_label: String,
}

impl CampaignBody {
    pub fn render(campaign: Campaign, now: DateTime<Utc>) -> CampaignBody {
        let countdown = campaign
            .window()
            .map(|window| CountdownState::from(window.compute(now)))
            .unwrap_or(CountdownState::Pending);

        CampaignBody {
            funding_percentage: campaign.funding_percentage(),
            countdown_label: countdown.label(),
            countdown,
            id: campaign.id,
            title: campaign.title,
            description: campaign.description,
            goal_amount: campaign.goal_amount,
            raised_amount: campaign.raised_amount,
            start_date: campaign.start_date,
            end_date: campaign.end_date,
        }
    }
}

fn render_all(campaigns: Vec<Campaign>, now: DateTime<Utc>) -> Vec<CampaignBody> {
    campaigns
        .into_iter()
        .map(|campaign| CampaignBody::render(campaign, now))
        .collect()
}

#[get("/campaigns")]
#[tracing::instrument(skip(api, clock))]
pub async fn get_campaigns(
    api: Data<dyn PortalApi>,
    clock: Data<dyn Clock>,
    session: Session,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let campaigns = manager::get_campaigns(&**api, &session).await?;

    Ok(Json(render_all(campaigns, clock.now())))
}

#[get("/campaigns/ONGOING")]
#[tracing::instrument(skip(api, clock))]
pub async fn get_ongoing_campaigns(
    api: Data<dyn PortalApi>,
    clock: Data<dyn Clock>,
    session: Session,
) -> Result<Json<Vec<CampaignBody>>, Error> {
    let now = clock.now();
    let campaigns = manager::get_ongoing_campaigns(&**api, &session, now).await?;

    Ok(Json(render_all(campaigns, now)))
}

#[get("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(api, clock))]
pub async fn get_campaign_by_id(
    api: Data<dyn PortalApi>,
    clock: Data<dyn Clock>,
    session: Session,
    params: Path<CampaignId>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();

    let campaign =
        manager::get_campaign_by_id(&**api, &session, campaign_id).await?;

    Ok(Json(CampaignBody::render(campaign, clock.now())))
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExtendCampaignBody {
    pub days: u32,
}

#[post("/campaigns")]
#[tracing::instrument(skip(api, clock))]
pub async fn create_campaign(
    api: Data<dyn PortalApi>,
    clock: Data<dyn Clock>,
    session: Session,
    body: Json<CampaignDraft>,
) -> Result<Json<CampaignBody>, Error> {
    let draft = body.into_inner();

    let campaign = manager::create_campaign(&**api, &session, draft).await?;

    Ok(Json(CampaignBody::render(campaign, clock.now())))
}

#[put("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(api, clock))]
pub async fn update_campaign(
    api: Data<dyn PortalApi>,
    clock: Data<dyn Clock>,
    session: Session,
    params: Path<CampaignId>,
    body: Json<CampaignDraft>,
) -> Result<Json<CampaignBody>, Error> {
    let campaign_id = params.into_inner();
    let draft = body.into_inner();

    let campaign = manager::update_campaign(&**api, &session, campaign_id, draft).await?;

    Ok(Json(CampaignBody::render(campaign, clock.now())))
}

#[post("/campaigns/{campaign_id}/extend")]
#[tracing::instrument(skip(api))]
pub async fn extend_campaign(
    api: Data<dyn PortalApi>,
    session: Session,
    params: Path<CampaignId>,
    body: Json<ExtendCampaignBody>,
) -> Result<Json<SuccessBody>, Error> {
    let campaign_id = params.into_inner();
    let body = body.into_inner();

    manager::extend_campaign(&**api, &session, campaign_id, body.days).await?;

    Ok(Json(SuccessBody {}))
}

#[delete("/campaigns/{campaign_id}")]
#[tracing::instrument(skip(api))]
pub async fn delete_campaign(
    api: Data<dyn PortalApi>,
    session: Session,
    params: Path<CampaignId>,
) -> Result<Json<SuccessBody>, Error> {
    let campaign_id = params.into_inner();

    manager::delete_campaign(&**api, &session, campaign_id).await?;

    Ok(Json(SuccessBody {}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn render_includes_countdown_and_funding() {
        let campaign = Campaign {
            id: "c1".into(),
            title: "Winter Relief".to_string(),
            description: None,
            goal_amount: 1000.0,
            raised_amount: 250.0,
            start_date: Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap()),
        };

        let body = CampaignBody::render(campaign, Utc.with_ymd_and_hms(2024, 1, 6, 0, 0, 0).unwrap());

        assert_eq!(body.funding_percentage, 25.0);
        assert_eq!(body.countdown_label, "5d 0h 0m 0s");
        assert_eq!(body.countdown.countdown().unwrap().percentage, 50.0);
    }

    #[test]
    fn render_without_dates_is_pending() {
        let campaign: Campaign = serde_json::from_str(r#"{ "_id": "c2", "title": "t" }"#).unwrap();

        let body = CampaignBody::render(campaign, Utc::now());

        assert_eq!(body.countdown, CountdownState::Pending);
        assert_eq!(body.countdown_label, "Calculating...");
    }
}
