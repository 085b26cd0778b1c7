use anyhow::Result;
use axum_server::tls_rustls::RustlsConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use swarmgate::*;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = Arc::new(config::AppConfig::from_env()?);

    let swarm: Arc<dyn docker_client::SwarmApi> = Arc::new(docker_client::LocalDocker::connect(
        &app_config.docker.socket_path,
    )?);
    let nodes: Arc<dyn docker_client::NodeFactory> = Arc::new(docker_client::TlsNodeFactory::new(
        app_config.metrics,
        app_config.http.request_timeout(),
    ));

    // Only managers join the overlay network; workers are never targets of
    // direct task calls from this process.
    if app_config.swarm.role == models::NodeRole::Manager {
        let joiner = joiner::NetworkJoiner::new(
            Arc::clone(&swarm),
            app_config.swarm.network.clone(),
            app_config.swarm.container_id.clone(),
        );
        tokio::spawn(async move {
            let state = joiner.run().await;
            tracing::info!(?state, "network joiner finished");
        });
    }

    let state = routes::AppState::new(Arc::clone(&app_config), swarm, nodes)?;
    let app = routes::app(state);

    let tls = RustlsConfig::from_pem_file(&app_config.server.cert_path, &app_config.server.key_path)
        .await?;
    let addr = SocketAddr::from(([0, 0, 0, 0], app_config.server.port));
    tracing::info!("Listening on https://{}", addr);

    let server = axum_server::bind_rustls(addr, tls)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());

    tokio::select! {
        result = server => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    Ok(())
}
