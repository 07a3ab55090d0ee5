use std::time::Duration;

use tracing::info;

use crate::api::PortalApi;
use crate::campaign::{self, Campaign};
use crate::error::Error;
use crate::session::Session;

use super::views::{CountdownView, CountdownViewId, CountdownViews};

async fn load_campaigns(
    api: &dyn PortalApi,
    session: &Session,
    views: &CountdownViews,
    ongoing_only: bool,
) -> Result<Vec<Campaign>, Error> {
    if ongoing_only {
        campaign::manager::get_ongoing_campaigns(api, session, views.clock().now()).await
    } else {
        campaign::manager::get_campaigns(api, session).await
    }
}

/// Fetches the campaigns and starts a refresher over them.
#[tracing::instrument(skip(api, views))]
pub async fn create_countdown_view(
    api: &dyn PortalApi,
    session: &Session,
    views: &CountdownViews,
    ongoing_only: bool,
    tick_interval: Duration,
) -> Result<CountdownViewId, Error> {
    let campaigns = load_campaigns(api, session, views, ongoing_only).await?;
    let campaign_count = campaigns.len();

    let view = CountdownView::start(ongoing_only, campaigns, views.clock(), tick_interval);
    let view_id = views.insert(view)?;

    info!(%view_id, campaigns = campaign_count, "created countdown view");

    Ok(view_id)
}

/// Refetches the view's campaigns. On failure the view keeps its previous
/// campaign list and keeps ticking.
#[tracing::instrument(skip(api, views))]
pub async fn reload_countdown_view(
    api: &dyn PortalApi,
    session: &Session,
    views: &CountdownViews,
    view_id: CountdownViewId,
) -> Result<(), Error> {
    let ongoing_only = views
        .with_view(view_id, |view| view.ongoing_only)
        .ok_or(Error::CountdownViewDoesNotExist { view_id })?;

    let campaigns = load_campaigns(api, session, views, ongoing_only).await?;
    let now = views.clock().now();

    // the view may have been deleted while the campaigns were loading
    views
        .with_view(view_id, |view| view.replace_campaigns(campaigns, now))
        .ok_or(Error::CountdownViewDoesNotExist { view_id })?;

    Ok(())
}

pub fn get_countdown_view<R>(
    views: &CountdownViews,
    view_id: CountdownViewId,
    render: impl FnOnce(&CountdownView) -> R,
) -> Result<R, Error> {
    views
        .with_view(view_id, |view| render(view))
        .ok_or(Error::CountdownViewDoesNotExist { view_id })
}

#[tracing::instrument(skip(views))]
pub fn delete_countdown_view(views: &CountdownViews, view_id: CountdownViewId) -> Result<(), Error> {
    let mut view = views
        .remove(view_id)
        .ok_or(Error::CountdownViewDoesNotExist { view_id })?;

    view.stop();
    info!(%view_id, "deleted countdown view");

    Ok(())
}
