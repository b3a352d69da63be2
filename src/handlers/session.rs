use actix_web::{post, web, HttpResponse};
use chrono::Utc;
use diesel::Connection;

use crate::{
    auth,
    db::{players, sessions},
    error::{ApiError, ApiResult},
    types::{SessionRequest, SessionResponse},
};

use super::AppState;

/// Issues a session token for the player known under `userIdentifier`,
/// creating the player on first sight. Earlier sessions of the player are
/// replaced. Needs no token itself.
#[post("/session")]
pub async fn create_session(
    state: web::Data<AppState>,
    body: web::Json<SessionRequest>,
) -> ApiResult<HttpResponse> {
    let request = body.into_inner();

    let reference = request.reference()?.to_string();
    let ign = request.display_name();
    let valid_duration_ms = state.config.session_valid_ms;
    let now = Utc::now().naive_utc();

    let (session, created) = state
        .run(move |conn| {
            conn.transaction::<_, ApiError, _>(|conn| {
                let (player, created) =
                    players::find_or_create_by_reference(conn, &reference, &ign)?;

                let session = sessions::replace_session(conn, player.id, valid_duration_ms, now)?;

                Ok((session, created))
            })
        })
        .await?;

    auth::forget_player_sessions(session.player);

    if created {
        log::info!("[Auth] Registered player {} on first session", session.player);
    }

    log::debug!(
        "[Auth] Issued session {} to player {}",
        session.id,
        session.player
    );

    Ok(HttpResponse::Ok().json(SessionResponse {
        token: session.token,
    }))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};

    use crate::handlers::{configure, tests::test_state};

    #[actix_web::test]
    async fn malformed_session_requests_are_rejected() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        for body in [
            "not json",
            r#"{"IGN": "Ursa"}"#,
            r#"{"userIdentifier": 5}"#,
            r#"{"userIdentifier": "  "}"#,
        ] {
            let req = test::TestRequest::post()
                .uri("/session")
                .insert_header(("Content-Type", "application/json"))
                .set_payload(body)
                .to_request();

            let resp = test::call_service(&app, req).await;

            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body {}", body);
        }
    }

    #[actix_web::test]
    async fn session_route_needs_no_token() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/session")
            .set_json(serde_json::json!({"userIdentifier": "s123", "IGN": "Ursa"}))
            .to_request();

        let resp = test::call_service(&app, req).await;

        // The test database never answers, so the request gets past auth and fails on the pool.
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
