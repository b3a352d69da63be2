use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::NaiveDateTime;
use diesel::{
    dsl::sql,
    prelude::*,
    sql_types::{Bool, Timestamp},
};
use rand::RngCore;

use super::{
    models::{NewSession, Session},
    schema,
};

pub const TOKEN_BYTES: usize = 64;

const SESSION_EXPIRED_SQL: &str =
    "sessions.last_check_in + sessions.valid_duration_ms * INTERVAL '1 millisecond' <= ";

pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];

    rand::thread_rng().fill_bytes(&mut bytes);

    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn create_session(
    conn: &mut PgConnection,
    player_id: i32,
    valid_duration_ms: i64,
    now: NaiveDateTime,
) -> QueryResult<Session> {
    use schema::sessions::dsl::sessions;

    diesel::insert_into(sessions)
        .values(&NewSession {
            player: player_id,
            token: generate_token(),
            created_at: now,
            valid_duration_ms,
            last_check_in: now,
        })
        .returning(Session::as_returning())
        .get_result(conn)
}

/// Drops every session of the player and issues a new one, in one
/// transaction.
pub fn replace_session(
    conn: &mut PgConnection,
    player_id: i32,
    valid_duration_ms: i64,
    now: NaiveDateTime,
) -> QueryResult<Session> {
    use schema::sessions::dsl::{player, sessions};

    conn.transaction(|conn| {
        let dropped = diesel::delete(sessions.filter(player.eq(player_id))).execute(conn)?;

        if dropped > 0 {
            log::debug!(
                "[Auth] Replacing {} earlier sessions of player {}",
                dropped,
                player_id
            );
        }

        create_session(conn, player_id, valid_duration_ms, now)
    })
}

pub fn find_session(conn: &mut PgConnection, session_token: &str) -> QueryResult<Option<Session>> {
    use schema::sessions::dsl::{sessions, token};

    sessions
        .filter(token.eq(session_token))
        .select(Session::as_select())
        .first(conn)
        .optional()
}

/// Moves the session's validity window to start at `now`.
pub fn check_in(
    conn: &mut PgConnection,
    session_id: i32,
    now: NaiveDateTime,
) -> QueryResult<Option<Session>> {
    use schema::sessions::dsl::{last_check_in, sessions};

    diesel::update(sessions.find(session_id))
        .set(last_check_in.eq(now))
        .returning(Session::as_returning())
        .get_result(conn)
        .optional()
}

pub fn delete_expired_sessions(conn: &mut PgConnection, now: NaiveDateTime) -> QueryResult<usize> {
    use schema::sessions::dsl::sessions;

    diesel::delete(sessions.filter(sql::<Bool>(SESSION_EXPIRED_SQL).bind::<Timestamp, _>(now)))
        .execute(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_url_safe_and_unpadded() {
        let token = generate_token();

        // 64 bytes encode to 86 unpadded characters.
        assert_eq!(token.len(), 86);
        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }
}
