use std::sync::Arc;
use uuid::Uuid;
use warp::Filter;

use crate::room_manager::RoomManager;
use crate::session::SessionService;
use crate::websocket::ConnectionManager;
use harf_types::RoomError;

pub mod config;
pub mod oracle;
pub mod room_manager;
pub mod session;
pub mod websocket;

pub fn create_routes(
    connection_manager: Arc<ConnectionManager>,
    room_manager: Arc<RoomManager>,
    session_service: Arc<SessionService>,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    // Clone for filters
    let connection_manager_filter = warp::any().map({
        let connection_manager = connection_manager.clone();
        move || connection_manager.clone()
    });

    let room_manager_filter = warp::any().map({
        let room_manager = room_manager.clone();
        move || room_manager.clone()
    });

    let session_filter = warp::any().map({
        let session_service = session_service.clone();
        move || session_service.clone()
    });

    // WebSocket endpoint
    let websocket = warp::path("ws")
        .and(warp::ws())
        .and(connection_manager_filter.clone())
        .and(room_manager_filter.clone())
        .and(session_filter.clone())
        .map(|ws: warp::ws::Ws, conn_mgr, room_mgr, sessions| {
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, conn_mgr, room_mgr, sessions)
            })
        });

    // Health check endpoint
    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", warp::http::StatusCode::OK));

    // Read-side room endpoints - safe to poll, no session required
    let room = warp::path!("room" / String)
        .and(warp::get())
        .and(room_manager_filter.clone())
        .and_then(handle_room_request);

    let players = warp::path!("room" / String / "players")
        .and(warp::get())
        .and(room_manager_filter.clone())
        .and_then(handle_players_request);

    let active_round = warp::path!("room" / String / "round")
        .and(warp::get())
        .and(room_manager_filter.clone())
        .and_then(handle_active_round_request);

    let scoreboard = warp::path!("room" / String / "scoreboard")
        .and(warp::get())
        .and(room_manager_filter.clone())
        .and_then(handle_scoreboard_request);

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST"]);

    websocket
        .or(health)
        .or(players)
        .or(active_round)
        .or(scoreboard)
        .or(room)
        .with(cors)
        .with(warp::log("harf_server"))
}

fn parse_room_id(room_id: &str) -> Result<Uuid, warp::reply::WithStatus<warp::reply::Json>> {
    Uuid::parse_str(room_id).map_err(|_| {
        warp::reply::with_status(
            warp::reply::json(&serde_json::json!({
                "error": "Invalid room ID format"
            })),
            warp::http::StatusCode::BAD_REQUEST,
        )
    })
}

fn error_reply(error: RoomError) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = match error {
        RoomError::RoomNotFound | RoomError::RoundNotFound | RoomError::PlayerNotFound => {
            warp::http::StatusCode::NOT_FOUND
        }
        RoomError::Storage { .. } => {
            tracing::error!("storage failure serving a read request: {}", error);
            warp::http::StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => warp::http::StatusCode::BAD_REQUEST,
    };

    warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": error.to_string()
        })),
        status,
    )
}

async fn handle_room_request(
    room_id: String,
    room_manager: Arc<RoomManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let room_id = match parse_room_id(&room_id) {
        Ok(room_id) => room_id,
        Err(reply) => return Ok(reply),
    };

    match room_manager.get_room(room_id).await {
        Ok(room) => Ok(warp::reply::with_status(
            warp::reply::json(&room),
            warp::http::StatusCode::OK,
        )),
        Err(error) => Ok(error_reply(error)),
    }
}

async fn handle_players_request(
    room_id: String,
    room_manager: Arc<RoomManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let room_id = match parse_room_id(&room_id) {
        Ok(room_id) => room_id,
        Err(reply) => return Ok(reply),
    };

    match room_manager.list_players(room_id).await {
        Ok(players) => Ok(warp::reply::with_status(
            warp::reply::json(&players),
            warp::http::StatusCode::OK,
        )),
        Err(error) => Ok(error_reply(error)),
    }
}

async fn handle_active_round_request(
    room_id: String,
    room_manager: Arc<RoomManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let room_id = match parse_room_id(&room_id) {
        Ok(room_id) => room_id,
        Err(reply) => return Ok(reply),
    };

    match room_manager.active_round(room_id).await {
        Ok(round) => Ok(warp::reply::with_status(
            warp::reply::json(&round),
            warp::http::StatusCode::OK,
        )),
        Err(error) => Ok(error_reply(error)),
    }
}

async fn handle_scoreboard_request(
    room_id: String,
    room_manager: Arc<RoomManager>,
) -> Result<impl warp::Reply, warp::Rejection> {
    let room_id = match parse_room_id(&room_id) {
        Ok(room_id) => room_id,
        Err(reply) => return Ok(reply),
    };

    match room_manager.scoreboard(room_id).await {
        Ok(scoreboard) => Ok(warp::reply::with_status(
            warp::reply::json(&scoreboard),
            warp::http::StatusCode::OK,
        )),
        Err(error) => Ok(error_reply(error)),
    }
}
