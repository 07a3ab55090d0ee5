use actix_web::web::{Data, Json, Path};
use actix_web::{delete, get, post};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::PortalApi;
use crate::campaign::CampaignId;
use crate::config::PortalPolicy;
use crate::error::Error;
use crate::session::Session;
use crate::utils::SuccessBody;

use super::views::{CountdownView, CountdownViewId, CountdownViews};
use super::{manager, CountdownState};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CreateCountdownViewBody {
    #[serde(default)]
    pub ongoing_only: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CountdownEntryBody {
    pub campaign_id: CampaignId,
    pub title: String,
    pub label: String,
    pub countdown: CountdownState,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CountdownViewBody {
    pub id: CountdownViewId,
    pub ongoing_only: bool,
    pub tick: u64,
    pub sampled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub reloaded_at: DateTime<Utc>,
    pub entries: Vec<CountdownEntryBody>,
}

impl CountdownViewBody {
    pub fn render(view: &CountdownView) -> CountdownViewBody {
        let snapshot = view.snapshot();

        CountdownViewBody {
            id: view.id,
            ongoing_only: view.ongoing_only,
            tick: snapshot.tick,
            sampled_at: snapshot.sampled_at,
            created_at: view.created_at,
            reloaded_at: view.reloaded_at,
            entries: view
                .campaigns()
                .iter()
                .map(|campaign| {
                    let countdown = snapshot.state(&campaign.id);
                    CountdownEntryBody {
                        campaign_id: campaign.id.clone(),
                        title: campaign.title.clone(),
                        label: countdown.label(),
                        countdown,
                    }
                })
                .collect(),
        }
    }
}

#[post("/countdowns")]
#[tracing::instrument(skip(api, views, policy))]
pub async fn create_countdown_view(
    api: Data<dyn PortalApi>,
    views: Data<CountdownViews>,
    policy: Data<PortalPolicy>,
    session: Session,
    body: Json<CreateCountdownViewBody>,
) -> Result<Json<CountdownViewBody>, Error> {
    let body = body.into_inner();

    let view_id = manager::create_countdown_view(
        &**api,
        &session,
        &views,
        body.ongoing_only,
        policy.tick_interval,
    )
    .await?;

    let body = manager::get_countdown_view(&views, view_id, CountdownViewBody::render)?;

    Ok(Json(body))
}

#[get("/countdowns/{view_id}")]
#[tracing::instrument(skip(views))]
pub async fn get_countdown_view(
    views: Data<CountdownViews>,
    _session: Session,
    params: Path<CountdownViewId>,
) -> Result<Json<CountdownViewBody>, Error> {
    let view_id = params.into_inner();

    let body = manager::get_countdown_view(&views, view_id, CountdownViewBody::render)?;

    Ok(Json(body))
}

#[post("/countdowns/{view_id}/reload")]
#[tracing::instrument(skip(api, views))]
pub async fn reload_countdown_view(
    api: Data<dyn PortalApi>,
    views: Data<CountdownViews>,
    session: Session,
    params: Path<CountdownViewId>,
) -> Result<Json<CountdownViewBody>, Error> {
    let view_id = params.into_inner();

    manager::reload_countdown_view(&**api, &session, &views, view_id).await?;

    let body = manager::get_countdown_view(&views, view_id, CountdownViewBody::render)?;

    Ok(Json(body))
}

#[delete("/countdowns/{view_id}")]
#[tracing::instrument(skip(views))]
pub async fn delete_countdown_view(
    views: Data<CountdownViews>,
    _session: Session,
    params: Path<CountdownViewId>,
) -> Result<Json<SuccessBody>, Error> {
    let view_id = params.into_inner();

    manager::delete_countdown_view(&views, view_id)?;

    Ok(Json(SuccessBody {}))
}
