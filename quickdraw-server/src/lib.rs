use std::sync::Arc;
use warp::Filter;
use warp::http::StatusCode;

use crate::session::SessionManager;
use crate::websocket::ConnectionManager;
use quickdraw_core::{SettingsEditor, SettingsStore, WordCatalog};
use quickdraw_types::{CategorySummary, GameSettings, SettingsResponse, SettingsUpdate};

pub mod config;
pub mod session;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    session_manager: Arc<SessionManager>,
    settings_store: SettingsStore,
    catalog: Arc<WordCatalog>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let session_manager_filter = warp::any().map({
        let session_manager = session_manager.clone();
        move || session_manager.clone()
    });

    let settings_filter = warp::any().map({
        let settings_store = settings_store.clone();
        move || settings_store.clone()
    });

    let catalog_filter = warp::any().map({
        let catalog = catalog.clone();
        move || catalog.clone()
    });

    // WebSocket endpoint, one round per socket
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter)
        .and(session_manager_filter)
        .map(|ws: warp::ws::Ws, conn_mgr, session_mgr| {
            ws.on_upgrade(move |socket| websocket::handle_connection(socket, conn_mgr, session_mgr))
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    let categories = warp::path!("categories")
        .and(warp::get())
        .and(catalog_filter)
        .map(|catalog: Arc<WordCatalog>| {
            let summaries: Vec<CategorySummary> =
                catalog.categories().iter().map(CategorySummary::from).collect();
            warp::reply::json(&summaries)
        });

    let get_settings = warp::path!("settings")
        .and(warp::get())
        .and(settings_filter.clone())
        .and_then(handle_get_settings);

    let update_settings = warp::path!("settings")
        .and(warp::put())
        .and(warp::body::json::<SettingsUpdate>())
        .and(settings_filter.clone())
        .and_then(handle_update_settings);

    let reset_settings = warp::path!("settings" / "reset")
        .and(warp::post())
        .and(settings_filter)
        .and_then(handle_reset_settings);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "PUT"]);

    websocket
        .or(health)
        .or(categories)
        .or(get_settings)
        .or(update_settings)
        .or(reset_settings)
        .with(cors)
        .with(warp::log("quickdraw"))
}

fn error_reply(message: &str, status: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({ "error": message })),
        status,
    )
}

fn settings_reply(
    settings: GameSettings,
    rejected_fields: Vec<String>,
) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&SettingsResponse {
            settings,
            rejected_fields,
        }),
        StatusCode::OK,
    )
}

async fn handle_get_settings(
    settings_store: SettingsStore,
) -> Result<impl warp::Reply, warp::Rejection> {
    match settings_store.load().await {
        Ok(settings) => Ok(warp::reply::with_status(
            warp::reply::json(&settings),
            StatusCode::OK,
        )),
        Err(err) => {
            tracing::error!("Failed to load settings: {}", err);
            Ok(error_reply(
                "Failed to load settings",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}

/// Apply a partial update through the same rules the settings editor
/// enforces. Rejected fields are reported back, not treated as an error.
async fn handle_update_settings(
    update: SettingsUpdate,
    settings_store: SettingsStore,
) -> Result<impl warp::Reply, warp::Rejection> {
    let current = match settings_store.load().await {
        Ok(settings) => settings,
        Err(err) => {
            tracing::error!("Failed to load settings: {}", err);
            return Ok(error_reply(
                "Failed to load settings",
                StatusCode::INTERNAL_SERVER_ERROR,
            ));
        }
    };

    let mut editor = SettingsEditor::new(current);
    let rejected_fields = editor.apply(&update);
    let settings = editor.into_settings();

    if let Err(err) = settings_store.save(&settings).await {
        tracing::error!("Failed to save settings: {}", err);
        return Ok(error_reply(
            "Failed to save settings",
            StatusCode::INTERNAL_SERVER_ERROR,
        ));
    }

    Ok(settings_reply(settings, rejected_fields))
}

async fn handle_reset_settings(
    settings_store: SettingsStore,
) -> Result<impl warp::Reply, warp::Rejection> {
    let settings = GameSettings::default();

    match settings_store.save(&settings).await {
        Ok(()) => Ok(settings_reply(settings, Vec::new())),
        Err(err) => {
            tracing::error!("Failed to reset settings: {}", err);
            Ok(error_reply(
                "Failed to reset settings",
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
