use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;
use warp::Filter;
use warp::Reply;
use warp::http::StatusCode;

use table_types::{GameError, GameId, Identity, ServerMessage, SessionError, SessionToken};

use crate::fanout::NotificationFanout;
use crate::game_registry::GameRegistry;
use crate::identity::IdentityStore;
use crate::websocket::ConnectionRegistry;

pub mod config;
pub mod fanout;
pub mod game_registry;
pub mod identity;
pub mod websocket;

const SESSION_COOKIE: &str = "sid";

#[derive(Serialize)]
struct CreateGameResponse {
    game_id: GameId,
}

#[derive(Serialize)]
struct DrawResponse {
    cards: u32,
}

pub fn create_routes(
    identities: Arc<IdentityStore>,
    games: Arc<GameRegistry>,
    connections: Arc<ConnectionRegistry>,
    fanout: Arc<NotificationFanout>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    // Clone for filters
    let identities_filter = warp::any().map({
        let identities = identities.clone();
        move || identities.clone()
    });

    let games_filter = warp::any().map({
        let games = games.clone();
        move || games.clone()
    });

    let connections_filter = warp::any().map({
        let connections = connections.clone();
        move || connections.clone()
    });

    let fanout_filter = warp::any().map({
        let fanout = fanout.clone();
        move || fanout.clone()
    });

    let session_cookie = warp::cookie::optional::<String>(SESSION_COOKIE);

    // WebSocket endpoint; the upgrade is refused without a live session
    let websocket_route = warp::path("ws")
        .and(warp::ws())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and(connections_filter.clone())
        .and_then(handle_channel_open);

    let login = warp::path!("login")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and_then(handle_login);

    let logout = warp::path!("logout")
        .and(warp::delete())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and(connections_filter.clone())
        .and_then(handle_logout);

    let create_game = warp::path!("game")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and(games_filter.clone())
        .and_then(handle_create_game);

    let join_game = warp::path!("game" / String / "join")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and(games_filter.clone())
        .and_then(handle_join_game);

    let draw_card = warp::path!("game" / String / "draw")
        .and(warp::post())
        .and(session_cookie.clone())
        .and(identities_filter.clone())
        .and(games_filter.clone())
        .and(fanout_filter.clone())
        .and_then(handle_draw_card);

    // Health check endpoint
    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // CORS configuration
    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    websocket_route
        .or(login)
        .or(logout)
        .or(create_game)
        .or(join_game)
        .or(draw_card)
        .or(health)
        .with(cors)
        .with(warp::log("card_table"))
}

fn parse_session(cookie: &Option<String>) -> Option<SessionToken> {
    // Garbage cookies count as no session, not as a malformed request.
    cookie.as_deref().and_then(|raw| Uuid::parse_str(raw).ok())
}

async fn authenticate(
    cookie: &Option<String>,
    identities: &IdentityStore,
) -> Result<Identity, SessionError> {
    match parse_session(cookie) {
        // Renewing here gives sessions their sliding lifetime: any
        // authenticated action pushes the expiry forward.
        Some(token) => identities
            .renew(token)
            .await
            .ok_or(SessionError::Unauthenticated),
        None => Err(SessionError::Unauthenticated),
    }
}

fn json_reply<T: Serialize>(status: StatusCode, body: &T) -> warp::reply::Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}

fn error_reply(status: StatusCode, message: impl ToString) -> warp::reply::Response {
    json_reply(
        status,
        &serde_json::json!({ "error": message.to_string() }),
    )
}

fn game_error_reply(error: GameError) -> warp::reply::Response {
    let status = match &error {
        GameError::GameNotFound { .. } => StatusCode::NOT_FOUND,
        GameError::AlreadyInAGame => StatusCode::CONFLICT,
        GameError::NotAParticipant => StatusCode::FORBIDDEN,
    };
    error_reply(status, error)
}

async fn handle_login(
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match identities.login(parse_session(&cookie)).await {
        Ok((token, identity)) => {
            info!("Session created for identity {}", identity);
            let cookie_value = format!(
                "{}={}; Path=/; HttpOnly; Max-Age={}",
                SESSION_COOKIE,
                token,
                identities.session_ttl().as_secs()
            );
            let reply = warp::reply::json(&serde_json::json!({ "result": "OK" }));
            let reply = warp::reply::with_header(reply, "set-cookie", cookie_value);
            Ok(warp::reply::with_status(reply, StatusCode::OK).into_response())
        }
        Err(error) => {
            warn!("Login attempted on an already-authenticated session");
            Ok(error_reply(StatusCode::CONFLICT, error))
        }
    }
}

async fn handle_logout(
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
    connections: Arc<ConnectionRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    if let Some(token) = parse_session(&cookie) {
        if let Some(identity) = identities.revoke(token).await {
            // Dropping the binding drops the channel sender; the writer task
            // ends and the socket closes.
            connections.unbind(identity).await;
        }
    }

    // Destroying an already-destroyed session is a no-op, never an error.
    let reply = warp::reply::json(&serde_json::json!({ "result": "OK" }));
    let reply = warp::reply::with_header(
        reply,
        "set-cookie",
        format!("{}=deleted; Path=/; HttpOnly; Max-Age=0", SESSION_COOKIE),
    );
    Ok(warp::reply::with_status(reply, StatusCode::OK).into_response())
}

async fn handle_create_game(
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
    games: Arc<GameRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let identity = match authenticate(&cookie, &identities).await {
        Ok(identity) => identity,
        Err(error) => return Ok(error_reply(StatusCode::UNAUTHORIZED, error)),
    };

    let game_id = games.create_game().await;
    info!("Identity {} created game {}", identity, game_id);
    Ok(json_reply(StatusCode::OK, &CreateGameResponse { game_id }))
}

async fn handle_join_game(
    game_id: String,
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
    games: Arc<GameRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let identity = match authenticate(&cookie, &identities).await {
        Ok(identity) => identity,
        Err(error) => return Ok(error_reply(StatusCode::UNAUTHORIZED, error)),
    };

    let game_id = match Uuid::parse_str(&game_id) {
        Ok(game_id) => game_id,
        Err(_) => return Ok(error_reply(StatusCode::BAD_REQUEST, "invalid game ID format")),
    };

    match games.join(game_id, identity).await {
        Ok(()) => {
            info!("Identity {} joined game {}", identity, game_id);
            Ok(json_reply(
                StatusCode::OK,
                &serde_json::json!({ "result": "OK" }),
            ))
        }
        Err(error) => {
            warn!(
                "Identity {} failed to join game {}: {}",
                identity, game_id, error
            );
            Ok(game_error_reply(error))
        }
    }
}

async fn handle_draw_card(
    game_id: String,
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
    games: Arc<GameRegistry>,
    fanout: Arc<NotificationFanout>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let identity = match authenticate(&cookie, &identities).await {
        Ok(identity) => identity,
        Err(error) => return Ok(error_reply(StatusCode::UNAUTHORIZED, error)),
    };

    let game_id = match Uuid::parse_str(&game_id) {
        Ok(game_id) => game_id,
        Err(_) => return Ok(error_reply(StatusCode::BAD_REQUEST, "invalid game ID format")),
    };

    match games.record_draw(game_id, identity).await {
        Ok(cards) => {
            info!(
                "Identity {} drew a card in game {}, now holds {}",
                identity, game_id, cards
            );
            fanout
                .broadcast(
                    game_id,
                    ServerMessage::CardDrawn {
                        game_id,
                        cards_held: cards as u32,
                    },
                )
                .await;
            Ok(json_reply(StatusCode::OK, &DrawResponse { cards: cards as u32 }))
        }
        Err(error) => {
            warn!(
                "Identity {} failed to draw in game {}: {}",
                identity, game_id, error
            );
            Ok(game_error_reply(error))
        }
    }
}

async fn handle_channel_open(
    ws: warp::ws::Ws,
    cookie: Option<String>,
    identities: Arc<IdentityStore>,
    connections: Arc<ConnectionRegistry>,
) -> Result<warp::reply::Response, warp::Rejection> {
    match authenticate(&cookie, &identities).await {
        Ok(identity) => Ok(ws
            .on_upgrade(move |socket| websocket::handle_connection(socket, identity, connections))
            .into_response()),
        Err(error) => {
            warn!("Rejected channel open without a session");
            Ok(error_reply(StatusCode::UNAUTHORIZED, error))
        }
    }
}
