//! HTTP surface used by the turtles.
//!
//! Every endpoint is a `GET` with query parameters and always answers
//! `200 OK` with a JSON body holding either `success` or `error`:
//!
//! | Route | Meaning |
//! |---|---|
//! | `/swarm/` | list swarm ids |
//! | `/swarm/{id}/` | swarm info |
//! | `/swarm/{id}/create/?w=&h=&token=` | create a swarm |
//! | `/swarm/{id}/claimshaft/?id=&token=` | claim the next shaft |
//! | `/swarm/{id}/finishedshaft/?x=&z=&token=` | finish a claimed shaft |

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::SwarmError;
use crate::scheduler::{Shaft, SwarmInfo};
use crate::service::{CommandParams, QuarryService};

#[derive(Debug, Clone)]
pub struct ApiState {
    pub service: QuarryService,
}

#[derive(Serialize)]
struct ListResponse {
    success: Vec<String>,
}

#[derive(Serialize)]
struct InfoResponse {
    success: SwarmInfo,
}

#[derive(Serialize)]
struct CreateResponse {
    success: &'static str,
    shafts: usize,
}

#[derive(Serialize)]
struct ClaimResponse {
    success: Shaft,
    done: bool,
}

#[derive(Serialize)]
struct FinishResponse {
    success: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    done: Option<bool>,
}

impl IntoResponse for SwarmError {
    fn into_response(self) -> Response {
        let status = match self {
            SwarmError::Io(_) | SwarmError::Snapshot(_) | SwarmError::CorruptSnapshot(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::OK,
        };
        // Running out of shafts also tells the turtle the swarm is done.
        let done = matches!(self, SwarmError::NoRemainingShafts).then_some(true);
        let body = ErrorResponse {
            error: self.wire_message(),
            done,
        };
        (status, Json(body)).into_response()
    }
}

/// Address of the calling client, as used for IP-locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<ApiState> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ApiState,
    ) -> Result<Self, Self::Rejection> {
        if state.service.access().config().trust_forwarded_for {
            let forwarded = parts
                .headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(ip) = forwarded {
                return Ok(ClientIp(ip.to_string()));
            }
        }

        let ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        Ok(ClientIp(ip))
    }
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/swarm", get(list_handler))
        .route("/swarm/", get(list_handler))
        .route("/swarm/{swarm_id}", get(info_handler))
        .route("/swarm/{swarm_id}/", get(info_handler))
        .route("/swarm/{swarm_id}/{command}", get(command_handler))
        .route("/swarm/{swarm_id}/{command}/", get(command_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve the API on `addr` until `shutdown` is cancelled, then let in-flight
/// requests finish.
pub async fn run_http(
    addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Running swarm quarry host");

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
}

async fn index_handler() -> &'static str {
    "This is a placeholder!"
}

async fn list_handler(State(state): State<ApiState>) -> Json<ListResponse> {
    Json(ListResponse {
        success: state.service.list().await,
    })
}

async fn info_handler(
    State(state): State<ApiState>,
    Path(swarm_id): Path<String>,
) -> Result<Json<InfoResponse>, SwarmError> {
    let info = state.service.info(&swarm_id).await?;
    Ok(Json(InfoResponse { success: info }))
}

async fn command_handler(
    State(state): State<ApiState>,
    Path((swarm_id, command)): Path<(String, String)>,
    ClientIp(client_ip): ClientIp,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Response {
    let params = CommandParams::from_pairs(pairs);
    tracing::trace!(swarm_id = %swarm_id, command = %command, client_ip = %client_ip, "Swarm command");
    let service = &state.service;

    let result = match command.as_str() {
        "create" => service
            .create(&swarm_id, &params, &client_ip)
            .await
            .map(|shafts| {
                Json(CreateResponse {
                    success: "swarm created",
                    shafts,
                })
                .into_response()
            }),
        "claimshaft" => service
            .claim(&swarm_id, &params, &client_ip)
            .await
            .map(|outcome| {
                Json(ClaimResponse {
                    success: outcome.shaft,
                    done: outcome.done,
                })
                .into_response()
            }),
        "finishedshaft" => service
            .finish(&swarm_id, &params, &client_ip)
            .await
            .map(|_| Json(FinishResponse { success: true }).into_response()),
        _ => {
            return Json(ErrorResponse {
                error: "unrecognized command",
                done: None,
            })
            .into_response()
        }
    };

    result.unwrap_or_else(|e| {
        tracing::debug!(swarm_id = %swarm_id, command = %command, error = %e, "Swarm command rejected");
        e.into_response()
    })
}
