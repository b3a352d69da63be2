use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;

use crate::{
    db::{colonies, players},
    error::{ApiError, ApiResult},
    types::{
        ColoniesResponse, ColonyId, ColonyInfoResponse, ColonyOverviewResponse,
        CreateColonyRequest, PlayerId, PlayerResponse, PreferenceResponse, PreferencesResponse,
    },
};

use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_player)
        .service(get_preferences)
        .service(get_colonies)
        .service(get_colony)
        .service(create_colony);
}

#[get("/player/{id}")]
pub async fn get_player(
    state: web::Data<AppState>,
    path: web::Path<PlayerId>,
) -> ApiResult<HttpResponse> {
    let player_id = path.into_inner();

    let response = state
        .run(move |conn| {
            let player = players::require_player(conn, player_id)?;
            let achievements = players::player_achievements(conn, player_id)?;

            Ok(PlayerResponse::new(player, &achievements))
        })
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[get("/player/{id}/preferences")]
pub async fn get_preferences(
    state: web::Data<AppState>,
    path: web::Path<PlayerId>,
) -> ApiResult<HttpResponse> {
    let player_id = path.into_inner();

    let preferences = state
        .run(move |conn| {
            players::require_player(conn, player_id)?;

            Ok(players::player_preferences(conn, player_id)?)
        })
        .await?;

    Ok(HttpResponse::Ok().json(PreferencesResponse {
        preferences: preferences
            .into_iter()
            .map(PreferenceResponse::from)
            .collect(),
    }))
}

#[get("/player/{id}/colonies")]
pub async fn get_colonies(
    state: web::Data<AppState>,
    path: web::Path<PlayerId>,
) -> ApiResult<HttpResponse> {
    let player_id = path.into_inner();

    let overviews = state
        .run(move |conn| {
            players::require_player(conn, player_id)?;

            let owned = players::player_colonies(conn, player_id)?;

            Ok(colonies::colony_overview(conn, owned)?)
        })
        .await?;

    Ok(HttpResponse::Ok().json(ColoniesResponse {
        colonies: overviews
            .into_iter()
            .map(ColonyOverviewResponse::from)
            .collect(),
    }))
}

#[get("/player/{id}/colony/{colony_id}")]
pub async fn get_colony(
    state: web::Data<AppState>,
    path: web::Path<(PlayerId, ColonyId)>,
) -> ApiResult<HttpResponse> {
    let (player_id, colony_id) = path.into_inner();

    let details = state
        .run(move |conn| {
            let colony = colonies::colony_for_owner(conn, colony_id, player_id)?.ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Colony {} not found or not owned by player {}",
                    colony_id, player_id
                ))
            })?;

            Ok(colonies::colony_details(conn, colony)?)
        })
        .await?;

    Ok(HttpResponse::Ok().json(ColonyInfoResponse::from(details)))
}

/// An empty body creates a colony with default name and no placements.
fn parse_create_request(body: &[u8]) -> ApiResult<CreateColonyRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(CreateColonyRequest::default());
    }

    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))
}

#[post("/player/{id}/colony/create")]
pub async fn create_colony(
    state: web::Data<AppState>,
    path: web::Path<PlayerId>,
    body: web::Bytes,
) -> ApiResult<HttpResponse> {
    let player_id = path.into_inner();
    let request = parse_create_request(&body)?;
    let now = Utc::now().naive_utc();

    let details = state
        .run(move |conn| colonies::create_colony(conn, player_id, request.into(), now))
        .await?;

    Ok(HttpResponse::Created().json(ColonyInfoResponse::from(details)))
}
