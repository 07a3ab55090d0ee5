use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::api::PortalApi;
use crate::error::Error;
use crate::session::Session;
use crate::utils::{ensure_path_safe, invalid_field};

use super::{Campaign, CampaignDraft, CampaignId};

/// Longest single extension accepted, in days.
pub const MAX_EXTENSION_DAYS: u32 = 3650;

#[tracing::instrument(skip(api))]
pub async fn get_campaigns(api: &dyn PortalApi, session: &Session) -> Result<Vec<Campaign>, Error> {
    let campaigns = api.campaigns().fetch_campaigns(session).await?;

    Ok(campaigns)
}

/// Campaigns whose end date is still ahead of `now`.
#[tracing::instrument(skip(api))]
pub async fn get_ongoing_campaigns(
    api: &dyn PortalApi,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<Vec<Campaign>, Error> {
    let campaigns = api
        .campaigns()
        .fetch_campaigns(session)
        .await?
        .into_iter()
        .filter(|campaign| campaign.is_ongoing(now))
        .collect();

    Ok(campaigns)
}

#[tracing::instrument(skip(api))]
pub async fn get_campaign_by_id(
    api: &dyn PortalApi,
    session: &Session,
    campaign_id: CampaignId,
) -> Result<Campaign, Error> {
    let campaign = api
        .campaigns()
        .fetch_campaigns(session)
        .await?
        .into_iter()
        .find(|campaign| campaign.id == campaign_id)
        .ok_or(Error::CampaignDoesNotExist { campaign_id })?;

    Ok(campaign)
}

#[tracing::instrument(skip(api))]
pub async fn create_campaign(
    api: &dyn PortalApi,
    session: &Session,
    draft: CampaignDraft,
) -> Result<Campaign, Error> {
    draft.validate()?;

    let campaign = api.campaigns().create_campaign(session, &draft).await?;
    info!(campaign_id = %campaign.id, "created campaign");

    Ok(campaign)
}

#[tracing::instrument(skip(api))]
pub async fn update_campaign(
    api: &dyn PortalApi,
    session: &Session,
    campaign_id: CampaignId,
    draft: CampaignDraft,
) -> Result<Campaign, Error> {
    ensure_path_safe(&campaign_id)?;
    draft.validate()?;

    let campaign = api
        .campaigns()
        .update_campaign(session, &campaign_id, &draft)
        .await?;
    info!(%campaign_id, "updated campaign");

    Ok(campaign)
}

#[tracing::instrument(skip(api))]
pub async fn extend_campaign(
    api: &dyn PortalApi,
    session: &Session,
    campaign_id: CampaignId,
    days: u32,
) -> Result<(), Error> {
    ensure_path_safe(&campaign_id)?;
    if days == 0 || days > MAX_EXTENSION_DAYS {
        return Err(invalid_field("days", "must be between 1 and 3650"));
    }

    api.campaigns()
        .extend_campaign(session, &campaign_id, Duration::days(i64::from(days)))
        .await?;
    info!(%campaign_id, days, "extended campaign");

    Ok(())
}

#[tracing::instrument(skip(api))]
pub async fn delete_campaign(
    api: &dyn PortalApi,
    session: &Session,
    campaign_id: CampaignId,
) -> Result<(), Error> {
    ensure_path_safe(&campaign_id)?;

    api.campaigns().delete_campaign(session, &campaign_id).await?;
    info!(%campaign_id, "deleted campaign");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test::MockPortalApi;
    use chrono::{Duration, TimeZone};
    use std::sync::{Arc, Mutex};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn campaign(id: &str, end_date: Option<DateTime<Utc>>) -> Campaign {
        Campaign {
            id: id.into(),
            title: format!("Campaign {}", id),
            description: None,
            goal_amount: 1000.0,
            raised_amount: 0.0,
            start_date: end_date.map(|end| end - Duration::days(30)),
            end_date,
        }
    }

    fn api_with(campaigns: Vec<Campaign>, called: Arc<Mutex<bool>>) -> MockPortalApi {
        let mut api = MockPortalApi::new();
        api.campaigns.on_fetch_campaigns = Box::new(move |session| {
            *called.lock().unwrap() = true;
            assert_eq!(session.token(), "token");
            Ok(campaigns.clone())
        });
        api
    }

    #[tokio::test]
    async fn ongoing_campaigns_end_after_now() {
        let called_fetch = Arc::new(Mutex::new(false));
        let api = api_with(
            vec![
                campaign("past", Some(now() - Duration::days(1))),
                campaign("exact", Some(now())),
                campaign("future", Some(now() + Duration::days(1))),
                campaign("undated", None),
            ],
            Arc::clone(&called_fetch),
        );

        let campaigns = get_ongoing_campaigns(&api, &Session::bearer("token"), now())
            .await
            .unwrap();

        let ids: Vec<&str> = campaigns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["future"]);
        assert!(
            *called_fetch.lock().unwrap(),
            "api.fetch_campaigns was not called"
        );
    }

    #[tokio::test]
    async fn get_campaign_by_id_returns_campaign() {
        let api = api_with(
            vec![campaign("a", None), campaign("b", None)],
            Arc::new(Mutex::new(false)),
        );

        let campaign = get_campaign_by_id(&api, &Session::bearer("token"), "b".into())
            .await
            .unwrap();

        assert_eq!(campaign.title, "Campaign b");
    }

    #[tokio::test]
    async fn get_campaign_by_id_returns_error_if_doesnt_exist() {
        let api = api_with(vec![campaign("a", None)], Arc::new(Mutex::new(false)));

        let result = get_campaign_by_id(&api, &Session::bearer("token"), "z".into()).await;

        assert_eq!(
            result.unwrap_err(),
            Error::CampaignDoesNotExist {
                campaign_id: "z".into()
            }
        );
    }

    fn draft() -> CampaignDraft {
        CampaignDraft {
            title: "Winter Relief".to_string(),
            description: "Blankets".to_string(),
            goal_amount: 1000.0,
            start_date: now(),
            end_date: now() + Duration::days(10),
        }
    }

    #[tokio::test]
    async fn create_campaign_forwards_valid_draft() {
        let mut api = MockPortalApi::new();
        api.campaigns.on_create_campaign = Box::new(|session, draft| {
            assert_eq!(session.token(), "token");
            Ok(Campaign {
                id: "new".into(),
                title: draft.title.clone(),
                description: Some(draft.description.clone()),
                goal_amount: draft.goal_amount,
                raised_amount: 0.0,
                start_date: Some(draft.start_date),
                end_date: Some(draft.end_date),
            })
        });

        let campaign = create_campaign(&api, &Session::bearer("token"), draft())
            .await
            .unwrap();

        assert_eq!(campaign.id.as_str(), "new");
        assert_eq!(campaign.title, "Winter Relief");
    }

    #[tokio::test]
    async fn invalid_draft_is_rejected_before_calling_api() {
        let api = MockPortalApi::new();
        let draft = CampaignDraft {
            goal_amount: 0.0,
            ..draft()
        };

        let result = create_campaign(&api, &Session::bearer("token"), draft).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidField { field: "goalAmount", .. }
        ));
    }

    #[tokio::test]
    async fn update_campaign_targets_the_given_id() {
        let called = Arc::new(Mutex::new(false));
        let called_clone = Arc::clone(&called);
        let mut api = MockPortalApi::new();
        api.campaigns.on_update_campaign = Box::new(move |_, campaign_id, draft| {
            *called_clone.lock().unwrap() = true;
            assert_eq!(campaign_id.as_str(), "c1");
            Ok(campaign("c1", Some(draft.end_date)))
        });

        let campaign = update_campaign(&api, &Session::bearer("token"), "c1".into(), draft())
            .await
            .unwrap();

        assert_eq!(campaign.end_date, Some(now() + Duration::days(10)));
        assert!(*called.lock().unwrap(), "api.update_campaign was not called");
    }

    #[tokio::test]
    async fn extend_campaign_converts_days() {
        let mut api = MockPortalApi::new();
        api.campaigns.on_extend_campaign = Box::new(|_, campaign_id, extension| {
            assert_eq!(campaign_id.as_str(), "c1");
            assert_eq!(extension.num_milliseconds(), 3 * 24 * 60 * 60 * 1000);
            Ok(())
        });
        let session = Session::bearer("token");

        extend_campaign(&api, &session, "c1".into(), 3).await.unwrap();

        assert!(matches!(
            extend_campaign(&api, &session, "c1".into(), 0).await.unwrap_err(),
            Error::InvalidField { field: "days", .. }
        ));
    }

    #[tokio::test]
    async fn ids_that_escape_the_path_are_rejected() {
        let api = MockPortalApi::new();
        let session = Session::bearer("token");

        let deleted = delete_campaign(&api, &session, "../users/u1".into()).await;
        let extended = extend_campaign(&api, &session, "a?b".into(), 1).await;

        assert!(matches!(deleted.unwrap_err(), Error::InvalidField { field: "id", .. }));
        assert!(matches!(extended.unwrap_err(), Error::InvalidField { field: "id", .. }));
    }

    #[tokio::test]
    async fn delete_campaign_propagates_rejection() {
        let mut api = MockPortalApi::new();
        api.campaigns.on_delete_campaign = Box::new(|_, _| {
            Err(Error::UpstreamRejected {
                status: 403,
                message: "Access denied".to_string(),
            })
        });

        let result = delete_campaign(&api, &Session::bearer("token"), "c1".into()).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::UpstreamRejected { status: 403, .. }
        ));
    }

    #[tokio::test]
    async fn upstream_errors_propagate() {
        let mut api = MockPortalApi::new();
        api.campaigns.on_fetch_campaigns = Box::new(|_| {
            Err(Error::UpstreamRejected {
                status: 401,
                message: "Token is not valid".to_string(),
            })
        });

        let result = get_campaigns(&api, &Session::bearer("token")).await;

        assert!(matches!(
            result.unwrap_err(),
            Error::UpstreamRejected { status: 401, .. }
        ));
    }
}
