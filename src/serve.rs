use std::net::SocketAddr;

use anyhow::Result;
use board_proxy::{AccountProxy, ACCOUNTS_PATH};
use clap::ArgMatches;
use tokio::signal;
use tracing::info;

use crate::settings::Settings;

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("signal received, starting graceful shutdown");
}

async fn server(settings: Settings, addr: SocketAddr) -> Result<()> {
    let conf = settings.proxy_config()?;
    info!(
        endpoint = %conf.endpoint,
        board_id = conf.board_id,
        token_set = conf.api_token.is_some(),
        "starting account proxy"
    );

    let router = AccountProxy::new(conf).start();
    let server = axum::Server::bind(&addr).serve(router.into_make_service());

    println!("Serving accounts at http://{}{}", server.local_addr(), ACCOUNTS_PATH);

    server.with_graceful_shutdown(shutdown_signal()).await?;

    Ok(())
}

pub(crate) async fn run(matches: &ArgMatches, settings: Settings) -> Result<()> {
    let addr = match matches.value_of("listen") {
        Some(listen) => listen.parse()?,
        None => settings.listen,
    };

    server(settings, addr).await
}
