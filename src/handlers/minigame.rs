use actix_web::{get, web, HttpResponse};

use crate::{
    db::minigames,
    error::{ApiError, ApiResult},
    types::{MinigameResponse, MinimizedMinigameQuery, MinimizedMinigameResponse},
};

use super::AppState;

/// `minimized` must be registered before `{id}` or it is parsed as an id.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_minimized_minigame).service(get_minigame);
}

#[get("/minigames/minimized")]
pub async fn get_minimized_minigame(
    state: web::Data<AppState>,
    query: web::Query<MinimizedMinigameQuery>,
) -> ApiResult<HttpResponse> {
    let MinimizedMinigameQuery {
        minigame,
        difficulty,
    } = query.into_inner();

    let (settings, overwriting_settings) = state
        .run(move |conn| {
            minigames::settings_for(conn, minigame, difficulty)?
                .ok_or_else(|| ApiError::NotFound("No such minigame or difficulty".to_string()))
        })
        .await?;

    let effective_settings = minigames::merge_settings(&settings, &overwriting_settings);

    Ok(HttpResponse::Ok().json(MinimizedMinigameResponse {
        settings,
        overwriting_settings,
        effective_settings,
    }))
}

#[get("/minigames/{id}")]
pub async fn get_minigame(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let minigame_id = path.into_inner();

    let (minigame, difficulties) = state
        .run(move |conn| {
            minigames::minigame_with_difficulties(conn, minigame_id)?
                .ok_or_else(|| ApiError::NotFound(format!("No minigame with id {}", minigame_id)))
        })
        .await?;

    Ok(HttpResponse::Ok().json(MinigameResponse::new(minigame, difficulties)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test, App};

    use crate::handlers::{configure, tests::test_state};

    #[actix_web::test]
    async fn minimized_requires_both_ids() {
        let app = test::init_service(App::new().app_data(test_state()).configure(configure)).await;

        let req = test::TestRequest::get()
            .uri("/minigames/minimized?minigame=1")
            .insert_header(("Authorization", "Bearer token"))
            .to_request();

        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
