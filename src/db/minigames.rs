use diesel::prelude::*;
use serde_json::Value;

use super::{
    models::{MiniGame, MiniGameDifficulty},
    schema,
};

/// The minigame with its difficulties ordered by id.
pub fn minigame_with_difficulties(
    conn: &mut PgConnection,
    minigame_id: i32,
) -> QueryResult<Option<(MiniGame, Vec<MiniGameDifficulty>)>> {
    use schema::minigame_difficulties::dsl::id as difficulty_id;
    use schema::minigames::dsl::minigames;

    let Some(minigame) = minigames
        .find(minigame_id)
        .select(MiniGame::as_select())
        .first(conn)
        .optional()?
    else {
        return Ok(None);
    };

    let difficulties = MiniGameDifficulty::belonging_to(&minigame)
        .order(difficulty_id.asc())
        .select(MiniGameDifficulty::as_select())
        .load(conn)?;

    Ok(Some((minigame, difficulties)))
}

/// Base settings of the minigame and the overrides of one of its
/// difficulties. `None` unless the difficulty belongs to the minigame.
pub fn settings_for(
    conn: &mut PgConnection,
    minigame_id: i32,
    difficulty_id: i32,
) -> QueryResult<Option<(Value, Value)>> {
    use schema::minigame_difficulties::dsl::{id, minigame, minigame_difficulties, overwriting_settings};
    use schema::minigames::dsl::{minigames, settings};

    minigame_difficulties
        .inner_join(minigames)
        .filter(id.eq(difficulty_id).and(minigame.eq(minigame_id)))
        .select((settings, overwriting_settings))
        .first(conn)
        .optional()
}

/// Applies `overrides` on top of `base`. Objects merge key by key,
/// recursively; any other override value replaces the base value.
pub fn merge_settings(base: &Value, overrides: &Value) -> Value {
    match (base, overrides) {
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged = base.clone();

            for (key, value) in overrides {
                let next = match merged.get(key) {
                    Some(existing) => merge_settings(existing, value),
                    None => value.clone(),
                };

                merged.insert(key.to_owned(), next);
            }

            Value::Object(merged)
        }

        (_, overrides) => overrides.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::merge_settings;
    use serde_json::json;

    #[test]
    fn overrides_merge_recursively() {
        let base = json!({
            "timeLimit": 60,
            "spawn": { "rate": 1.0, "max": 10 },
            "theme": "forest"
        });

        let overrides = json!({
            "timeLimit": 45,
            "spawn": { "rate": 2.5 }
        });

        assert_eq!(
            merge_settings(&base, &overrides),
            json!({
                "timeLimit": 45,
                "spawn": { "rate": 2.5, "max": 10 },
                "theme": "forest"
            })
        );
    }

    #[test]
    fn non_object_overrides_replace() {
        let base = json!({ "waves": [1, 2, 3] });

        assert_eq!(
            merge_settings(&base, &json!({ "waves": [4] })),
            json!({ "waves": [4] })
        );
        assert_eq!(merge_settings(&base, &json!(null)), json!(null));
    }

    #[test]
    fn empty_overrides_keep_base() {
        let base = json!({ "lives": 3 });

        assert_eq!(merge_settings(&base, &json!({})), base);
    }
}
