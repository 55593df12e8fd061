use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{info, warn};

use harf_core::{AnswerValidator, Dictionary};
use harf_persistence::connection::connect_and_migrate;
use harf_server::{
    config::Config, create_routes, oracle::WikipediaOracle, room_manager::RoomManager,
    session::SessionService, websocket::ConnectionManager,
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting harf server...");

    let config = Config::new();
    let connection_manager = Arc::new(ConnectionManager::new());

    // Load the local word list; the oracle covers words it misses.
    let dictionary = match &config.words_file {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(contents) => {
                let dictionary = Dictionary::parse(&contents);
                info!("Loaded {} words from {}", dictionary.len(), path);
                dictionary
            }
            Err(e) => {
                tracing::error!("Failed to read word list '{}': {}", path, e);
                tracing::error!("Unset WORDS_FILE to run with the oracle alone.");
                std::process::exit(1);
            }
        },
        None => {
            warn!("WORDS_FILE not set; all validation will go to the word oracle");
            Dictionary::with_entries([])
        }
    };

    let validator = Arc::new(AnswerValidator::new(
        Arc::new(dictionary),
        Arc::new(WikipediaOracle::new()),
    ));

    // Initialize database connection and run migrations
    let db = match connect_and_migrate().await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };

    let room_manager = Arc::new(RoomManager::new(
        db,
        validator,
        connection_manager.clone(),
    ));
    let session_service = Arc::new(SessionService::new());

    let routes = create_routes(
        connection_manager.clone(),
        room_manager.clone(),
        session_service.clone(),
    );

    // Start sweep task: stale connections, overdue rounds, idle sessions
    let sweep_connection_manager = connection_manager.clone();
    let sweep_room_manager = room_manager.clone();
    let sweep_session_service = session_service.clone();
    let sweep_config = config.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_secs(sweep_config.sweep_interval_seconds));
        loop {
            interval.tick().await;
            let connection_timeout = Duration::from_secs(sweep_config.connection_timeout_seconds);
            let max_round_age = Duration::from_secs(sweep_config.max_round_seconds);
            let session_idle = Duration::from_secs(sweep_config.session_idle_seconds);

            sweep_connection_manager
                .cleanup_inactive_connections(connection_timeout)
                .await;
            sweep_room_manager.finish_overdue_rounds(max_round_age).await;

            let swept = sweep_session_service.sweep_idle(session_idle).await;
            if swept > 0 {
                info!("Swept {} idle sessions", swept);
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
