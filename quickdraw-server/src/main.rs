use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use quickdraw_core::{SettingsStore, WordCatalog};
use quickdraw_persistence::{SettingsRepository, connect_and_migrate};
use quickdraw_server::{
    config::Config,
    create_routes,
    session::SessionManager,
    websocket::{ConnectionManager, close_inactive_connections},
};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting Quick Draw server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let catalog = match &config.categories_directory {
        Some(dir) => {
            info!("Loading categories from directory: {}", dir);
            match WordCatalog::from_directory(dir) {
                Ok(catalog) => catalog,
                Err(e) => {
                    error!("Failed to load categories from '{}': {}", dir, e);
                    error!("Unset CATEGORIES_DIRECTORY to use the built-in categories.");
                    std::process::exit(1);
                }
            }
        }
        None => WordCatalog::builtin(),
    };
    let catalog = Arc::new(catalog);

    // Initialize database connection and run migrations
    let db = match connect_and_migrate(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to connect to database and run migrations: {}", e);
            std::process::exit(1);
        }
    };
    let settings_store = SettingsStore::new(Arc::new(SettingsRepository::new(db)));

    let connection_manager = Arc::new(ConnectionManager::new());
    let session_manager = Arc::new(SessionManager::new(
        catalog.clone(),
        settings_store.clone(),
    ));

    let routes = create_routes(
        connection_manager.clone(),
        session_manager.clone(),
        settings_store,
        catalog,
    );

    // Silent sockets lose their session, which closes them
    let connection_timeout = Duration::from_secs(config.connection_timeout_seconds);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(30));
        loop {
            interval.tick().await;
            close_inactive_connections(&connection_manager, &session_manager, connection_timeout)
                .await;
        }
    });

    let bind_address = match config.bind_address().await {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) =
        warp::serve(routes).bind_with_graceful_shutdown(bind_address, shutdown_signal());

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigint, mut sigterm) =
            match (signal(SignalKind::interrupt()), signal(SignalKind::terminate())) {
                (Ok(sigint), Ok(sigterm)) => (sigint, sigterm),
                (Err(e), _) | (_, Err(e)) => {
                    error!("Failed to install signal handlers: {}", e);
                    std::future::pending::<()>().await;
                    return;
                }
            };

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
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
