use std::net::SocketAddr;

use kube::Client;
use tokio::{task::JoinHandle, try_join};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{config::OperatorConfig, controller::run_controller, web::run_http_server};

pub fn compute_http_addr(cfg: &OperatorConfig) -> SocketAddr {
    ([0, 0, 0, 0], cfg.http_port).into()
}

pub fn spawn_controller(
    client: Client,
    cfg: OperatorConfig,
    shutdown: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_controller(client, cfg, shutdown).await })
}

pub fn spawn_http(
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> JoinHandle<anyhow::Result<()>> {
    tokio::spawn(async move { run_http_server(addr, shutdown).await })
}

/// Cancel `shutdown` on ctrl-c / SIGTERM.
pub fn spawn_signal_handler(shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        info!("shutdown signal received");
        shutdown.cancel();
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {},
                _ = term.recv() => {},
            }
        }
        Err(_) => {
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Run the controller and the health endpoint until shutdown.
pub async fn run_all(client: Client, cfg: OperatorConfig) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let _signals = spawn_signal_handler(shutdown.clone());

    let http = spawn_http(compute_http_addr(&cfg), shutdown.clone());
    let controller = spawn_controller(client, cfg, shutdown.clone());

    let (c_res, h_res) = try_join!(controller, http)?;
    c_res?;
    h_res?;
    Ok(())
}
