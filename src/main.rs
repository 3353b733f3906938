use anyhow::Context;
use ferrytrips::{
    api, config::Config, db::init_db, Repository, SnapshotSource, TickOrchestrator,
    WsfDataSource,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .with_context(|| format!("failed to initialize database at {}", config.database_path))?;

    let repo = Arc::new(Repository::new(pool));
    let source: Arc<dyn SnapshotSource> = Arc::new(WsfDataSource::new(
        config.wsf_api_url.clone(),
        config.wsf_api_access_code.clone(),
        config.retry_max_elapsed,
    ));

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let orchestrator = TickOrchestrator::from_config(source, repo.clone(), &config);
    let tick_loop = tokio::spawn(async move {
        orchestrator
            .run(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await;
    });

    let app = api::create_router(api::AppState::new(repo));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(true);
    tick_loop.await.context("tick loop panicked")?;

    Ok(())
}
