use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use judgehub::config::{CliArgs, Config};
use judgehub::database as db;
use judgehub::judge::{BatchPoller, Judge0Client, Orchestrator};
use judgehub::web_server::build_server;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let db_path = db::get_db_path()?;
    let cli = CliArgs::parse();

    let Config {
        server: server_config,
        judge: judge_config,
        languages,
    } = cli.to_config().context("Failed to load configuration")?;

    if cli.flush_data {
        db::remove_db(&db_path);
    }

    let db_pool = db::init_db(&db_path)
        .await
        .context("Failed to initialize database")?;

    let client = Judge0Client::new(
        &judge_config.base_url,
        judge_config.api_key.clone(),
        judge_config.request_timeout(),
    )
    .context("Failed to build judge client")?;
    let poller = BatchPoller::new(
        Arc::new(client),
        judge_config.poll_policy(),
        judge_config.max_in_flight,
    );
    let orchestrator = Orchestrator::new(poller, languages);
    let shutdown_token = CancellationToken::new();

    log::info!(
        "Using judge at {} with {} languages",
        judge_config.base_url,
        orchestrator.languages().len()
    );

    // ======= PREPARATION END, EXECUTION START =======

    let server = build_server(server_config, orchestrator, db_pool, shutdown_token.clone())
        .context("Failed to build server")?;

    let server_handle = server.handle();
    let server_task = actix_web::rt::spawn(server);

    // ===== EXECUTION END, WAITING FOR SHUTDOWN ======

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("Ctrl-c received, shutting down...");
        }
        res_server = server_task => {
            log::error!("Server terminated unexpectedly: {:?}", res_server);
        }
    }

    // 1. Stop in-flight polling so handlers return promptly
    shutdown_token.cancel();

    // 2. Shutdown actix-web server gracefully
    server_handle.stop(true).await;

    log::info!("Shutdown complete");
    Ok(())
}
