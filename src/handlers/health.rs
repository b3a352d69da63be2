use actix_web::{get, web, HttpResponse};
use diesel::{sql_query, RunQueryDsl};
use serde::Serialize;

use crate::{error::ApiResult, multiplayer::LobbyHealth};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: bool,
    pub database: bool,
    pub multiplayer: LobbyHealth,
}

#[get("/")]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().body("Colony backend is running")
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    let database = match state
        .run(|conn| Ok(sql_query("SELECT 1").execute(conn)?))
        .await
    {
        Ok(_) => true,
        Err(e) => {
            log::warn!("[Server] Health check could not reach the database: {}", e);
            false
        }
    };

    let multiplayer = state.lobbies.health().await;

    let response = HealthResponse {
        status: database && multiplayer.status,
        database,
        multiplayer,
    };

    if response.status {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(response))
    }
}
