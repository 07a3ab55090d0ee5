use intern_portal::{config, Config, Error};
use tracing::info;
use tracing_subscriber::fmt::format::FmtSpan;

#[actix_web::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(config::load_log_level()?)
        .with_span_events(FmtSpan::NEW)
        .compact()
        .init();

    let config = Config::load()?;
    info!("serving on: {}", config.bind_address);

    intern_portal::run(config).await
}
