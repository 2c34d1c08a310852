use crate::error::CODE_BAD_REQUEST;
use crate::room::RelayRooms;
use axum::Json;
use axum::Router;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use huddle_core::utils::{CODE_ROOM_CLOSED, CODE_ROOM_FULL, CODE_UNKNOWN_USER};
use huddle_core::{
    JoinRequest, JoinResponse, LeaveRequest, PollQuery, RoomId, Signal, SignalsResponse,
    StatusResponse,
};
use tower_http::cors::{Any, CorsLayer};

/// Path prefix every relay route lives under.
pub const API_BASE: &str = "/api/webrtc";

pub fn router(rooms: RelayRooms) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(&format!("{API_BASE}/join/{{room}}"), post(join))
        .route(&format!("{API_BASE}/signals/{{room}}"), get(signals))
        .route(&format!("{API_BASE}/signal/{{room}}"), post(signal))
        .route(&format!("{API_BASE}/leave/{{room}}"), post(leave))
        .route(&format!("{API_BASE}/close/{{room}}"), post(close))
        .layer(cors)
        .with_state(rooms)
}

async fn join(
    State(rooms): State<RelayRooms>,
    Path(room): Path<String>,
    Json(request): Json<JoinRequest>,
) -> (StatusCode, Json<JoinResponse>) {
    let response = rooms.join(&RoomId::from(room), request);
    (http_status(response.code.as_deref()), Json(response))
}

async fn signals(
    State(rooms): State<RelayRooms>,
    Path(room): Path<String>,
    Query(query): Query<PollQuery>,
) -> (StatusCode, Json<SignalsResponse>) {
    let response = rooms.poll(&RoomId::from(room), query);
    (http_status(response.code.as_deref()), Json(response))
}

async fn signal(
    State(rooms): State<RelayRooms>,
    Path(room): Path<String>,
    Json(signal): Json<Signal>,
) -> (StatusCode, Json<StatusResponse>) {
    let response = rooms.post(&RoomId::from(room), signal);
    (http_status(response.code.as_deref()), Json(response))
}

async fn leave(
    State(rooms): State<RelayRooms>,
    Path(room): Path<String>,
    Json(request): Json<LeaveRequest>,
) -> (StatusCode, Json<StatusResponse>) {
    let response = rooms.leave(&RoomId::from(room), request);
    (http_status(response.code.as_deref()), Json(response))
}

async fn close(
    State(rooms): State<RelayRooms>,
    Path(room): Path<String>,
) -> (StatusCode, Json<StatusResponse>) {
    let response = rooms.close(&RoomId::from(room));
    (http_status(response.code.as_deref()), Json(response))
}

fn http_status(code: Option<&str>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some(CODE_ROOM_FULL) => StatusCode::CONFLICT,
        Some(CODE_ROOM_CLOSED) => StatusCode::GONE,
        Some(CODE_UNKNOWN_USER) => StatusCode::NOT_FOUND,
        Some(CODE_BAD_REQUEST) => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
