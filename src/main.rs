use anyhow::Context;
use stakemeter::orchestration::{StakingService, SystemClock};
use stakemeter::venue::HttpVenue;
use stakemeter::{api, config::Config, db::init_db, AccountId, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = Config::from_env().context("failed to load configuration")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    let venue = Arc::new(HttpVenue::new(config.venue_api_url.clone()));
    let service = StakingService::load(
        repo.clone(),
        venue.clone(),
        venue.clone(),
        venue,
        Arc::new(SystemClock),
        AccountId::new(config.custodian_account.clone()),
    )
    .await
    .context("failed to load engine state")?;

    let app = api::create_router(api::AppState::new(Arc::new(service), repo));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
