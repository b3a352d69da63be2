use diesel::prelude::*;

use crate::error::{ApiError, ApiResult};

use super::{
    models::{
        Achievement, Colony, NewPlayer, NewPlayerAchievement, NewPreference, Player, Preference,
    },
    schema,
};

pub fn get_player(conn: &mut PgConnection, player_id: i32) -> QueryResult<Option<Player>> {
    use schema::players::dsl::players;

    players
        .find(player_id)
        .select(Player::as_select())
        .first(conn)
        .optional()
}

/// Fails with `NotFound` unless the player exists.
pub fn require_player(conn: &mut PgConnection, player_id: i32) -> ApiResult<Player> {
    get_player(conn, player_id)?
        .ok_or_else(|| ApiError::NotFound(format!("No player with id {}", player_id)))
}

pub fn create_player(conn: &mut PgConnection, player: NewPlayer) -> QueryResult<Player> {
    use schema::players::dsl::players;

    diesel::insert_into(players)
        .values(&player)
        .returning(Player::as_returning())
        .get_result(conn)
}

pub fn player_by_reference(
    conn: &mut PgConnection,
    reference: &str,
) -> QueryResult<Option<Player>> {
    use schema::players::dsl::{players, reference_id};

    players
        .filter(reference_id.eq(reference))
        .select(Player::as_select())
        .first(conn)
        .optional()
}

/// The player registered under `reference`, created with `ign` on first
/// sight. The flag is `true` when the player was created by this call.
pub fn find_or_create_by_reference(
    conn: &mut PgConnection,
    reference: &str,
    ign: &str,
) -> QueryResult<(Player, bool)> {
    use schema::players::dsl::{players, reference_id};

    if let Some(player) = player_by_reference(conn, reference)? {
        return Ok((player, false));
    }

    let created = diesel::insert_into(players)
        .values(&NewPlayer {
            ign: ign.to_string(),
            sprite: None,
            reference_id: Some(reference.to_string()),
        })
        .on_conflict(reference_id)
        .do_nothing()
        .returning(Player::as_returning())
        .get_result(conn)
        .optional()?;

    match created {
        Some(player) => Ok((player, true)),
        None => player_by_reference(conn, reference)?
            .map(|player| (player, false))
            .ok_or(diesel::result::Error::NotFound),
    }
}

/// Achievements granted to the player, in the order they were unlocked.
pub fn player_achievements(
    conn: &mut PgConnection,
    player_id: i32,
) -> QueryResult<Vec<Achievement>> {
    use schema::achievements;
    use schema::player_achievements::dsl::{achievement, player, player_achievements, unlocked_at};

    player_achievements
        .inner_join(achievements::table)
        .filter(player.eq(player_id))
        .order((unlocked_at.asc(), achievement.asc()))
        .select(Achievement::as_select())
        .load(conn)
}

/// Granting an already granted achievement is a no-op. Returns whether a
/// new grant was recorded.
pub fn grant_achievement(
    conn: &mut PgConnection,
    player_id: i32,
    achievement_id: i32,
) -> QueryResult<bool> {
    use schema::player_achievements::dsl::player_achievements;

    let inserted = diesel::insert_into(player_achievements)
        .values(&NewPlayerAchievement {
            player: player_id,
            achievement: achievement_id,
        })
        .on_conflict_do_nothing()
        .execute(conn)?;

    Ok(inserted > 0)
}

pub fn player_preferences(conn: &mut PgConnection, player_id: i32) -> QueryResult<Vec<Preference>> {
    use schema::preferences::dsl::{id, player, preferences};

    preferences
        .filter(player.eq(player_id))
        .order(id.asc())
        .select(Preference::as_select())
        .load(conn)
}

/// Upserts on (player, key). The chosen value must be one of the available
/// values when any are listed.
pub fn set_preference(conn: &mut PgConnection, preference: NewPreference) -> ApiResult<Preference> {
    use schema::preferences::dsl::{player, preference_key, preferences};

    if !preference.available_values.is_empty()
        && !preference
            .available_values
            .contains(&preference.chosen_value)
    {
        return Err(ApiError::BadRequest(format!(
            "{} is not an available value for {}",
            preference.chosen_value, preference.preference_key
        )));
    }

    Ok(diesel::insert_into(preferences)
        .values(&preference)
        .on_conflict((player, preference_key))
        .do_update()
        .set(&preference)
        .returning(Preference::as_returning())
        .get_result(conn)?)
}

pub fn player_colonies(conn: &mut PgConnection, player_id: i32) -> QueryResult<Vec<Colony>> {
    use schema::colonies::dsl::{colonies, id, owner};

    colonies
        .filter(owner.eq(player_id))
        .order(id.asc())
        .select(Colony::as_select())
        .load(conn)
}

/// True once any granted achievement marks the tutorial as completed.
pub fn has_completed_tutorial(achievements: &[Achievement]) -> bool {
    achievements.iter().any(|a| a.is_tutorial_completed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn achievement(id: i32, is_tutorial_completed: bool) -> Achievement {
        Achievement {
            id,
            title: format!("achievement {}", id),
            description: None,
            icon: None,
            is_tutorial_completed,
        }
    }

    #[test]
    fn tutorial_completion_follows_flagged_achievement() {
        assert!(!has_completed_tutorial(&[]));
        assert!(!has_completed_tutorial(&[achievement(2, false)]));
        assert!(has_completed_tutorial(&[
            achievement(2, false),
            achievement(1, true)
        ]));
    }
}
