use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{debug, info};

use table_server::{
    config::Config, create_routes, fanout::NotificationFanout, game_registry::GameRegistry,
    identity::IdentityStore, websocket::ConnectionRegistry,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Card Table server...");

    let config = Config::new();
    let identities = Arc::new(IdentityStore::new(Duration::from_secs(
        config.session_ttl_seconds,
    )));
    let games = Arc::new(GameRegistry::new());
    let connections = Arc::new(ConnectionRegistry::new(config.channel_capacity));
    let fanout = Arc::new(NotificationFanout::new(games.clone(), connections.clone()));

    let routes = create_routes(
        identities.clone(),
        games.clone(),
        connections.clone(),
        fanout,
    );

    // Periodically prune sessions whose renewable lifetime ran out.
    let sweep_identities = identities.clone();
    let sweep_interval = Duration::from_secs(config.sweep_interval_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        loop {
            interval.tick().await;
            let removed = sweep_identities.sweep_expired().await;
            if removed > 0 {
                info!("Swept {} expired sessions", removed);
            } else {
                debug!("Session sweep found nothing to remove");
            }
        }
    });

    info!("Server starting on {}:{}", config.host, config.port);

    let addr = (
        config.host.parse::<std::net::IpAddr>().unwrap(),
        config.port,
    );

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown(addr, async {
        // Wait for SIGINT (Ctrl+C) or SIGTERM
        #[cfg(unix)]
        {
            let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt()).unwrap();
            let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate()).unwrap();

            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully...");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully...");
                }
            }
        }

        #[cfg(not(unix))]
        {
            signal::ctrl_c().await.expect("Failed to listen for ctrl+c");
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}
