//! HTTP control surface.
//!
//! | Route | Effect |
//! |-------|--------|
//! | `GET /etvr/config` | Full config snapshot |
//! | `POST /etvr/config` | Partial update, validated then persisted |
//! | `GET /etvr/start` | Start enabled workers |
//! | `GET /etvr/stop` | Stop both workers |
//! | `GET /etvr/restart` | Stop then start |
//! | `GET /etvr/status` | Worker states |
//!
//! Lifecycle routes are idempotent: starting a running worker or stopping an
//! idle one succeeds without doing anything.

use crate::config::EyeTrackConfig;
use crate::error::CoreError;
use crate::error::config::ConfigError;
use crate::etvr::{Etvr, EtvrStatus};

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use log::{debug, error};
use serde_json::Value;

type HandlerResult = Result<StatusCode, (StatusCode, String)>;

pub fn router(etvr: Arc<Etvr>) -> Router {
    Router::new()
        .route("/etvr/config", get(get_config).post(update_config))
        .route("/etvr/start", get(start))
        .route("/etvr/stop", get(stop))
        .route("/etvr/restart", get(restart))
        .route("/etvr/status", get(status))
        .with_state(etvr)
}

async fn get_config(State(etvr): State<Arc<Etvr>>) -> Json<EyeTrackConfig> {
    Json(etvr.config().snapshot().await)
}

async fn update_config(State(etvr): State<Arc<Etvr>>, Json(payload): Json<Value>) -> HandlerResult {
    debug!("Config update requested");

    match etvr.config().update(payload).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e @ ConfigError::ValidationError { .. }) => {
            Err((StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))
        }
        Err(e) => Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn start(State(etvr): State<Arc<Etvr>>) -> HandlerResult {
    etvr.start().await.map(|()| StatusCode::OK).map_err(lifecycle_error)
}

async fn stop(State(etvr): State<Arc<Etvr>>) -> Json<EtvrStatus> {
    Json(etvr.stop().await)
}

async fn restart(State(etvr): State<Arc<Etvr>>) -> HandlerResult {
    etvr.restart().await.map(|()| StatusCode::OK).map_err(lifecycle_error)
}

async fn status(State(etvr): State<Arc<Etvr>>) -> Json<EtvrStatus> {
    Json(etvr.status().await)
}

fn lifecycle_error(e: CoreError) -> (StatusCode, String) {
    error!("Lifecycle request failed: {e}");
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}
