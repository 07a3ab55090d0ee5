use actix_web::get;
use actix_web::web::{Data, Json};

use crate::api::PortalApi;
use crate::config::PortalPolicy;
use crate::error::Error;
use crate::session::Session;

use super::{manager, DashboardStats, InternProgress};

#[get("/dashboard/stats")]
#[tracing::instrument(skip(api))]
pub async fn get_dashboard_stats(
    api: Data<dyn PortalApi>,
    session: Session,
) -> Result<Json<DashboardStats>, Error> {
    let stats = manager::get_dashboard_stats(&**api, &session).await;

    Ok(Json(stats))
}

#[get("/dashboard/progress")]
#[tracing::instrument(skip(api, policy))]
pub async fn get_intern_progress(
    api: Data<dyn PortalApi>,
    policy: Data<PortalPolicy>,
    session: Session,
) -> Result<Json<InternProgress>, Error> {
    let progress = manager::get_intern_progress(&**api, &session, &policy).await?;

    Ok(Json(progress))
}
