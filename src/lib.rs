use std::sync::Arc;

use actix_web::web::{self, Data, JsonConfig, PathConfig, QueryConfig, ServiceConfig};
use actix_web::{App, HttpServer, ResponseError};
use tracing::info;
use tracing_actix_web::TracingLogger;

pub mod api;
pub mod campaign;
pub mod config;
pub mod countdown;
pub mod dashboard;
pub mod donation;
pub mod error;
pub mod session;
pub mod typedid;
pub mod user;
pub mod utils;

pub use config::{Config, PortalPolicy};
pub use error::Error;

use api::{HttpPortalApi, PortalApi};
use countdown::refresher::{Clock, SystemClock};
use countdown::views::{CountdownViews, ViewReaper};

/// Registers every endpoint. Expects `Data<dyn PortalApi>`,
/// `Data<dyn Clock>`, `Data<PortalPolicy>` and `Data<CountdownViews>` to be
/// provided by the app. Trait objects go in through `Data::from(Arc<dyn _>)`.
pub fn configure(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| {
        // format json errors with custom format
        Error::InvalidJson(err).into()
    }))
    .app_data(PathConfig::default().error_handler(|err, _req| {
        // format path errors with custom format
        Error::InvalidPath(err).into()
    }))
    .app_data(QueryConfig::default().error_handler(|err, _req| {
        // format query errors with custom format
        Error::InvalidQuery(err).into()
    }))
    .service(campaign::endpoints::get_campaigns)
    .service(campaign::endpoints::get_ongoing_campaigns)
    .service(campaign::endpoints::get_campaign_by_id)
    .service(campaign::endpoints::create_campaign)
    .service(campaign::endpoints::update_campaign)
    .service(campaign::endpoints::extend_campaign)
    .service(campaign::endpoints::delete_campaign)
    .service(countdown::endpoints::create_countdown_view)
    .service(countdown::endpoints::get_countdown_view)
    .service(countdown::endpoints::reload_countdown_view)
    .service(countdown::endpoints::delete_countdown_view)
    .service(user::endpoints::get_interns)
    .service(user::endpoints::create_intern)
    .service(user::endpoints::update_intern)
    .service(user::endpoints::delete_intern)
    .service(donation::endpoints::get_donation_summary)
    .service(donation::endpoints::get_leaderboard)
    .service(donation::endpoints::get_donations)
    .service(dashboard::endpoints::get_dashboard_stats)
    .service(dashboard::endpoints::get_intern_progress)
    .default_service(web::to(|| async { Error::PathDoesNotExist.error_response() }));
}

pub async fn run(config: Config) -> Result<(), Error> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let views = Arc::new(CountdownViews::new(Arc::clone(&clock), config.view_limits));
    let mut reaper = ViewReaper::start(Arc::clone(&views));
    let clock: Data<dyn Clock> = Data::from(clock);
    let policy = Data::new(config.policy.clone());

    let upstream_url = config.upstream_url.clone();
    let body_limit = config.upstream_body_limit;
    info!("proxying portal api at: {}", upstream_url);

    let server_views = Data::from(Arc::clone(&views));
    HttpServer::new(move || {
        // awc clients are bound to the worker's runtime
        let api: Arc<dyn PortalApi> = Arc::new(HttpPortalApi::new(upstream_url.clone(), body_limit));

        App::new()
            .app_data(Data::from(api))
            .app_data(clock.clone())
            .app_data(policy.clone())
            .app_data(server_views.clone())
            .wrap(TracingLogger::default())
            .configure(configure)
    })
    .bind(config.bind_address.as_str())?
    .run()
    .await?;

    reaper.stop();
    views.stop_all();

    Ok(())
}
