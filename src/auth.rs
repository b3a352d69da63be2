use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

use actix_http::HttpMessage;
use actix_web::{dev::ServiceRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use chrono::{NaiveDateTime, Utc};

use crate::{
    config::AuthLevel,
    db::{models::Session, sessions},
    error::ApiError,
    handlers::AppState,
};

struct CachedSession {
    session: Session,
    cached_at: Instant,
}

lazy_static::lazy_static! {
    static ref SESSION_CACHE: Mutex<HashMap<String, CachedSession>> = Mutex::new(HashMap::new());
}

fn cached_session(token: &str, max_age: Duration, now: NaiveDateTime) -> Option<Session> {
    let cache = SESSION_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

    cache
        .get(token)
        .filter(|entry| entry.cached_at.elapsed() < max_age && entry.session.is_valid_at(now))
        .map(|entry| entry.session.clone())
}

fn cache_session(session: Session) {
    SESSION_CACHE
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(
            session.token.to_owned(),
            CachedSession {
                session,
                cached_at: Instant::now(),
            },
        );
}

/// Evicts every cached session of the player. Returns how many were removed.
pub fn forget_player_sessions(player_id: i32) -> usize {
    let mut cache = SESSION_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

    let before = cache.len();

    cache.retain(|_, entry| entry.session.player != player_id);

    before - cache.len()
}

/// Drops cache entries older than `max_age`. Returns how many were removed.
pub fn prune_session_cache(max_age: Duration) -> usize {
    let mut cache = SESSION_CACHE.lock().unwrap_or_else(PoisonError::into_inner);

    let before = cache.len();

    cache.retain(|_, entry| entry.cached_at.elapsed() < max_age);

    before - cache.len()
}

/// Resolves a token to a live session, checking it in. Lookups are served
/// from the in-process cache while the entry is younger than the configured
/// cache window.
pub async fn authenticate(state: &web::Data<AppState>, token: String) -> Result<Session, ApiError> {
    let now = Utc::now().naive_utc();
    let max_age = Duration::from_secs(state.config.session_cache_secs);

    if let Some(session) = cached_session(&token, max_age, now) {
        return Ok(session);
    }

    let pool = state.pool.clone();

    let session = web::block(move || -> Result<Session, ApiError> {
        let mut conn = pool.get()?;

        let session = sessions::find_session(&mut conn, &token)?
            .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))?;

        if !session.is_valid_at(now) {
            return Err(ApiError::Unauthorized("Session expired".to_string()));
        }

        sessions::check_in(&mut conn, session.id, now)?
            .ok_or_else(|| ApiError::Unauthorized("Session expired".to_string()))
    })
    .await??;

    log::debug!(
        "[Auth] Player {} checked in with session {}",
        session.player,
        session.id
    );

    cache_session(session.clone());

    Ok(session)
}

/// Under strict auth the request's session must belong to `player_id`.
/// Naive auth attaches no session, so any player id is accepted.
pub fn ensure_acting_player(session: Option<&Session>, player_id: i32) -> Result<(), ApiError> {
    match session {
        Some(session) if session.player != player_id => Err(ApiError::Forbidden(format!(
            "Session belongs to player {}, not player {}",
            session.player, player_id
        ))),
        _ => Ok(()),
    }
}

pub async fn validator(
    req: ServiceRequest,
    credentials: BearerAuth,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    let token = credentials.token().trim().to_string();

    if token.is_empty() {
        return Err((
            ApiError::Unauthorized("Missing session token".to_string()).into(),
            req,
        ));
    }

    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Err((
            ApiError::Internal("Application state is not registered".to_string()).into(),
            req,
        ));
    };

    match state.config.auth_level {
        AuthLevel::Naive => Ok(req),

        AuthLevel::Strict => match authenticate(&state, token).await {
            Ok(session) => {
                req.extensions_mut().insert(session);

                Ok(req)
            }

            Err(e) => {
                log::debug!("[Auth] Rejected {}: {}", req.path(), e);

                Err((e.into(), req))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str, last_check_in: NaiveDateTime) -> Session {
        Session {
            id: 1,
            player: 1,
            token: token.to_string(),
            created_at: last_check_in,
            valid_duration_ms: 60_000,
            last_check_in,
        }
    }

    #[test]
    fn cache_serves_only_still_valid_sessions() {
        let now = Utc::now().naive_utc();

        cache_session(session("cache-valid", now));
        cache_session(session("cache-expired", now - chrono::Duration::minutes(5)));

        assert!(cached_session("cache-valid", Duration::from_secs(60), now).is_some());
        assert!(cached_session("cache-expired", Duration::from_secs(60), now).is_none());
        assert!(cached_session("cache-unknown", Duration::from_secs(60), now).is_none());
    }

    #[test]
    fn replaced_sessions_leave_the_cache() {
        let now = Utc::now().naive_utc();
        let mut other = session("cache-other-player", now);
        other.player = 77;

        let mut replaced = session("cache-replaced", now);
        replaced.player = 76;

        cache_session(other);
        cache_session(replaced);

        assert_eq!(forget_player_sessions(76), 1);
        assert!(cached_session("cache-replaced", Duration::from_secs(60), now).is_none());
        assert!(cached_session("cache-other-player", Duration::from_secs(60), now).is_some());
    }

    #[test]
    fn zero_cache_window_forces_lookup() {
        let now = Utc::now().naive_utc();

        cache_session(session("cache-window", now));

        assert!(cached_session("cache-window", Duration::ZERO, now).is_none());
    }

    #[test]
    fn session_must_match_the_acting_player() {
        let now = Utc::now().naive_utc();
        let own = session("acting", now);

        assert!(ensure_acting_player(Some(&own), 1).is_ok());
        assert!(ensure_acting_player(None, 42).is_ok());
        assert!(matches!(
            ensure_acting_player(Some(&own), 2),
            Err(ApiError::Forbidden(_))
        ));
    }
}
