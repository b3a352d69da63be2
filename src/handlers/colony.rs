use actix_web::{get, post, web, HttpResponse};
use chrono::Utc;

use crate::{
    auth,
    db::{
        colonies::{self, IssuedCode},
        models::Session,
    },
    error::{ApiError, ApiResult},
    types::{
        CloseColonyRequest, ColonyCodeResponse, ColonyId, JoinColonyResponse, LatestVisit,
        OpenColonyQuery, OpenColonyResponse, PathGraphResponse, PathResponse,
    },
};

use super::AppState;

/// `join/{code}` is registered before the `{id}` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(join_colony)
        .service(open_colony)
        .service(get_code)
        .service(close_colony)
        .service(update_last_visit)
        .service(get_path_graph);
}

fn colony_not_found(colony_id: ColonyId) -> ApiError {
    ApiError::NotFound(format!("No colony with id {}", colony_id))
}

#[get("/colony/join/{code}")]
pub async fn join_colony(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let raw = path.into_inner();

    let value = colonies::parse_code(&raw).ok_or_else(|| {
        ApiError::BadRequest(format!("Colony code must be exactly 6 digits, got {}", raw))
    })?;

    let now = Utc::now().naive_utc();

    let joined = state
        .run(move |conn| {
            let Some((code, owner)) = colonies::find_code(conn, value)? else {
                return Ok(None);
            };

            if !code.is_valid_at(now) {
                colonies::delete_code(conn, code.id)?;

                log::debug!("[colonies] Removed expired code {:06}", code.value);

                return Ok(None);
            }

            Ok(Some(JoinColonyResponse {
                lobby_id: code.lobby_id,
                multiplayer_server_address: code.server_address,
                owner,
                colony_id: code.colony,
            }))
        })
        .await?;

    match joined {
        Some(response) => Ok(HttpResponse::Ok().json(response)),
        None => Err(ApiError::NotFound(format!("No active colony with code {}", raw))),
    }
}

#[get("/colony/{id}/open")]
pub async fn open_colony(
    state: web::Data<AppState>,
    path: web::Path<ColonyId>,
    query: web::Query<OpenColonyQuery>,
    session: Option<web::ReqData<Session>>,
) -> ApiResult<HttpResponse> {
    let colony_id = path.into_inner();
    let OpenColonyQuery {
        player_id,
        valid_duration_ms,
    } = query.into_inner();

    auth::ensure_acting_player(session.as_deref(), player_id)?;

    let valid_duration_ms = valid_duration_ms.unwrap_or(state.config.colony_code_valid_ms);
    colonies::check_code_validity(valid_duration_ms)?;

    let now = Utc::now().naive_utc();

    let existing = state
        .run(move |conn| {
            colonies::colony_for_owner(conn, colony_id, player_id)?.ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Colony {} not found or not owned by player {}",
                    colony_id, player_id
                ))
            })?;

            Ok(colonies::active_code(conn, colony_id, now)?)
        })
        .await?;

    if let Some(code) = existing {
        return Ok(HttpResponse::Ok().json(OpenColonyResponse::from(&code)));
    }

    let lobby_id = state.lobbies.create_lobby(player_id, colony_id).await?;
    let server_address = state.config.multiplayer_external.to_owned();

    let issued = state
        .run(move |conn| {
            colonies::insert_code_for(
                conn,
                colony_id,
                lobby_id,
                &server_address,
                valid_duration_ms,
                now,
            )
        })
        .await?;

    match &issued {
        IssuedCode::Fresh(_) => log::info!(
            "[colonies] Opened colony {} in lobby {} for player {}",
            colony_id,
            lobby_id,
            player_id
        ),
        IssuedCode::Existing(code) => log::debug!(
            "[colonies] Colony {} was opened concurrently, lobby {} unused in favour of {}",
            colony_id,
            lobby_id,
            code.lobby_id
        ),
    }

    Ok(HttpResponse::Ok().json(OpenColonyResponse::from(issued.code())))
}

#[get("/colony/{id}/code")]
pub async fn get_code(
    state: web::Data<AppState>,
    path: web::Path<ColonyId>,
) -> ApiResult<HttpResponse> {
    let colony_id = path.into_inner();
    let now = Utc::now().naive_utc();

    let code = state
        .run(move |conn| {
            colonies::active_code(conn, colony_id, now)?.ok_or_else(|| {
                ApiError::NotFound(format!("Colony {} has no active code", colony_id))
            })
        })
        .await?;

    Ok(HttpResponse::Ok().json(ColonyCodeResponse::from(&code)))
}

#[post("/colony/{id}/close")]
pub async fn close_colony(
    state: web::Data<AppState>,
    path: web::Path<ColonyId>,
    body: web::Json<CloseColonyRequest>,
    session: Option<web::ReqData<Session>>,
) -> ApiResult<HttpResponse> {
    let colony_id = path.into_inner();
    let CloseColonyRequest { player_id } = body.into_inner();

    auth::ensure_acting_player(session.as_deref(), player_id)?;

    let closed = state
        .run(move |conn| colonies::close_colony(conn, colony_id, player_id))
        .await?;

    if !closed {
        return Err(ApiError::NotFound(format!(
            "Colony {} not found or not owned by player {}",
            colony_id, player_id
        )));
    }

    Ok(HttpResponse::Ok().finish())
}

#[post("/colony/{id}/update-last-visit")]
pub async fn update_last_visit(
    state: web::Data<AppState>,
    path: web::Path<ColonyId>,
    body: web::Json<LatestVisit>,
) -> ApiResult<HttpResponse> {
    let colony_id = path.into_inner();
    let visit = body.into_inner().latest_visit.naive_utc();

    let colony = state
        .run(move |conn| {
            colonies::update_latest_visit(conn, colony_id, visit)?
                .ok_or_else(|| colony_not_found(colony_id))
        })
        .await?;

    match colony.latest_visit {
        Some(latest_visit) => Ok(HttpResponse::Ok().json(LatestVisit {
            latest_visit: latest_visit.and_utc(),
        })),
        None => Err(ApiError::Internal(format!(
            "Colony {} has no latest visit after update",
            colony_id
        ))),
    }
}

#[get("/colony/{id}/pathgraph")]
pub async fn get_path_graph(
    state: web::Data<AppState>,
    path: web::Path<ColonyId>,
) -> ApiResult<HttpResponse> {
    let colony_id = path.into_inner();

    let paths = state
        .run(move |conn| {
            colonies::get_colony(conn, colony_id)?.ok_or_else(|| colony_not_found(colony_id))?;

            Ok(colonies::path_graph(conn, colony_id)?)
        })
        .await?;

    Ok(HttpResponse::Ok().json(PathGraphResponse {
        paths: paths.into_iter().map(PathResponse::from).collect(),
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App, HttpMessage};
    use chrono::Utc;

    use crate::{
        db::models::Session,
        handlers::{configure, tests::test_state},
    };

    #[actix_web::test]
    async fn join_codes_must_be_six_digits() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        for code in ["12345", "1234567", "12a456", "-12345"] {
            let req = test::TestRequest::get()
                .uri(&format!("/colony/join/{}", code))
                .insert_header(("Authorization", "Bearer token"))
                .to_request();

            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "code {}", code);
        }
    }

    #[actix_web::test]
    async fn open_requires_player_id() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/colony/3/open")
            .insert_header(("Authorization", "Bearer token"))
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn open_rejects_out_of_range_validity() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        for validity in ["0", "-5", "4294967296", "9223372036854775807"] {
            let req = test::TestRequest::get()
                .uri(&format!("/colony/3/open?playerId=1&validDurationMs={}", validity))
                .insert_header(("Authorization", "Bearer token"))
                .to_request();

            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "validity {}", validity);
        }
    }

    #[actix_web::test]
    async fn session_of_another_player_cannot_open_or_close() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;
        let now = Utc::now().naive_utc();

        let session = Session {
            id: 5,
            player: 2,
            token: "token".to_string(),
            created_at: now,
            valid_duration_ms: 60_000,
            last_check_in: now,
        };

        let open = test::TestRequest::get()
            .uri("/colony/3/open?playerId=1")
            .insert_header(("Authorization", "Bearer token"))
            .to_request();
        open.extensions_mut().insert(session.clone());

        assert_eq!(test::call_service(&app, open).await.status(), StatusCode::FORBIDDEN);

        let close = test::TestRequest::post()
            .uri("/colony/3/close")
            .insert_header(("Authorization", "Bearer token"))
            .set_json(serde_json::json!({"playerId": 1}))
            .to_request();
        close.extensions_mut().insert(session);

        assert_eq!(test::call_service(&app, close).await.status(), StatusCode::FORBIDDEN);
    }
}
