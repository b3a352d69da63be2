use chrono::{Duration, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::schema;

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::graphical_assets)]
pub struct GraphicalAsset {
    pub id: i32,
    pub alias: String,
    pub mime_type: String,
    pub use_case: String,
    pub width: i32,
    pub height: i32,
    pub has_lods: bool,
    pub blob: Option<Vec<u8>>,
}

/// An asset row without its blob.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::graphical_assets)]
pub struct AssetSummary {
    pub id: i32,
    pub alias: String,
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    pub has_lods: bool,
}

/// Insert and full-replacement update shape of a graphical asset. Updating
/// with `blob: None` clears the stored blob.
#[derive(Debug, Clone, Insertable, AsChangeset, PartialEq)]
#[diesel(table_name = schema::graphical_assets, treat_none_as_null = true)]
pub struct NewGraphicalAsset {
    pub alias: String,
    pub mime_type: String,
    pub use_case: String,
    pub width: i32,
    pub height: i32,
    pub has_lods: bool,
    pub blob: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(table_name = schema::lods, belongs_to(GraphicalAsset, foreign_key = graphical_asset))]
pub struct Lod {
    pub id: i32,
    pub detail_level: i32,
    pub blob: Vec<u8>,
    pub graphical_asset: i32,
}

/// A LOD row without its blob.
#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::lods)]
pub struct LodDetail {
    pub id: i32,
    pub detail_level: i32,
    pub graphical_asset: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::lods)]
pub struct NewLod {
    pub detail_level: i32,
    pub blob: Vec<u8>,
    pub graphical_asset: i32,
}

#[derive(Debug, Clone, Copy, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::transforms)]
pub struct Transform {
    pub id: i32,
    pub z_index: i32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub y_scale: f32,
}

#[derive(Debug, Clone, Copy, Insertable, Serialize, Deserialize, PartialEq)]
#[diesel(table_name = schema::transforms)]
#[serde(rename_all = "camelCase", default)]
pub struct NewTransform {
    pub z_index: i32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub y_scale: f32,
}

impl Default for NewTransform {
    /// Identity placement: unit scale, no offset, layered just above the background.
    fn default() -> Self {
        Self {
            z_index: 1,
            x_offset: 0.0,
            y_offset: 0.0,
            x_scale: 1.0,
            y_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::asset_collections)]
pub struct AssetCollection {
    pub id: i32,
    pub name: String,
    pub is_original: bool,
    pub original: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::asset_collections)]
pub struct NewAssetCollection {
    pub name: String,
    pub is_original: bool,
    pub original: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(table_name = schema::collection_entries, belongs_to(AssetCollection, foreign_key = asset_collection))]
pub struct CollectionEntry {
    pub id: i32,
    pub transform: i32,
    pub asset_collection: i32,
    pub graphical_asset: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::collection_entries)]
pub struct NewCollectionEntry {
    pub transform: i32,
    pub asset_collection: i32,
    pub graphical_asset: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::achievements)]
pub struct Achievement {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub is_tutorial_completed: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::achievements)]
pub struct NewAchievement {
    pub title: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub is_tutorial_completed: bool,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::players)]
pub struct Player {
    pub id: i32,
    pub ign: String,
    pub sprite: Option<i32>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::players)]
pub struct NewPlayer {
    pub ign: String,
    pub sprite: Option<i32>,
    pub reference_id: Option<String>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::player_achievements)]
pub struct NewPlayerAchievement {
    pub player: i32,
    pub achievement: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::preferences)]
pub struct Preference {
    pub id: i32,
    pub player: i32,
    pub preference_key: String,
    pub chosen_value: String,
    pub available_values: Vec<String>,
}

#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = schema::preferences)]
pub struct NewPreference {
    pub player: i32,
    pub preference_key: String,
    pub chosen_value: String,
    pub available_values: Vec<String>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::sessions)]
pub struct Session {
    pub id: i32,
    pub player: i32,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub valid_duration_ms: i64,
    pub last_check_in: NaiveDateTime,
}

/// Saturates at `NaiveDateTime::MAX` instead of overflowing.
fn expiry(start: NaiveDateTime, valid_duration_ms: i64) -> NaiveDateTime {
    Duration::try_milliseconds(valid_duration_ms)
        .and_then(|valid| start.checked_add_signed(valid))
        .unwrap_or(NaiveDateTime::MAX)
}

impl Session {
    pub fn expires_at(&self) -> NaiveDateTime {
        expiry(self.last_check_in, self.valid_duration_ms)
    }

    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        now < self.expires_at()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::sessions)]
pub struct NewSession {
    pub player: i32,
    pub token: String,
    pub created_at: NaiveDateTime,
    pub valid_duration_ms: i64,
    pub last_check_in: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::colonies)]
pub struct Colony {
    pub id: i32,
    pub name: String,
    pub account_level: i32,
    pub latest_visit: Option<NaiveDateTime>,
    pub owner: i32,
    pub colony_code: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::colonies)]
pub struct NewColony {
    pub name: String,
    pub account_level: i32,
    pub latest_visit: Option<NaiveDateTime>,
    pub owner: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::colony_codes)]
pub struct ColonyCode {
    pub id: i32,
    pub lobby_id: i32,
    pub server_address: String,
    pub colony: i32,
    pub value: i32,
    pub created_at: NaiveDateTime,
    pub valid_duration_ms: i64,
}

impl ColonyCode {
    pub fn expires_at(&self) -> NaiveDateTime {
        expiry(self.created_at, self.valid_duration_ms)
    }

    pub fn is_valid_at(&self, now: NaiveDateTime) -> bool {
        now < self.expires_at()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::colony_codes)]
pub struct NewColonyCode {
    pub lobby_id: i32,
    pub server_address: String,
    pub colony: i32,
    pub value: i32,
    pub created_at: NaiveDateTime,
    pub valid_duration_ms: i64,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(table_name = schema::colony_assets, belongs_to(Colony, foreign_key = colony))]
pub struct ColonyAsset {
    pub id: i32,
    pub asset_collection: i32,
    pub transform: i32,
    pub colony: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::colony_assets)]
pub struct NewColonyAsset {
    pub asset_collection: i32,
    pub transform: i32,
    pub colony: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(table_name = schema::colony_locations, belongs_to(Colony, foreign_key = colony))]
pub struct ColonyLocation {
    pub id: i32,
    pub colony: i32,
    pub location: i32,
    pub transform: i32,
    pub level: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::colony_locations)]
pub struct NewColonyLocation {
    pub colony: i32,
    pub location: i32,
    pub transform: i32,
    pub level: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::colony_location_paths)]
pub struct ColonyLocationPath {
    pub id: i32,
    pub colony: i32,
    pub location_a: i32,
    pub location_b: i32,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::colony_location_paths)]
pub struct NewColonyLocationPath {
    pub colony: i32,
    pub location_a: i32,
    pub location_b: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::locations)]
pub struct Location {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub asset_collection: i32,
    pub minigame: Option<i32>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::locations)]
pub struct NewLocation {
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub asset_collection: i32,
    pub minigame: Option<i32>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, PartialEq)]
#[diesel(table_name = schema::minigames)]
pub struct MiniGame {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub settings: Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::minigames)]
pub struct NewMiniGame {
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub settings: Value,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations, PartialEq)]
#[diesel(table_name = schema::minigame_difficulties, belongs_to(MiniGame, foreign_key = minigame))]
pub struct MiniGameDifficulty {
    pub id: i32,
    pub minigame: i32,
    pub icon: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub required_level: i32,
    pub overwriting_settings: Value,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = schema::minigame_difficulties)]
pub struct NewMiniGameDifficulty {
    pub minigame: i32,
    pub icon: Option<i32>,
    pub name: String,
    pub description: Option<String>,
    pub required_level: i32,
    pub overwriting_settings: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn default_transform_is_identity() {
        let t = NewTransform::default();

        assert_eq!((t.x_scale, t.y_scale), (1.0, 1.0));
        assert_eq!((t.x_offset, t.y_offset), (0.0, 0.0));
        assert_eq!(t.z_index, 1);
    }

    #[test]
    fn partial_transform_json_fills_identity_defaults() {
        let t: NewTransform = serde_json::from_str(r#"{"zIndex": -5, "xOffset": 12.5}"#).unwrap();

        assert_eq!(t.z_index, -5);
        assert_eq!(t.x_offset, 12.5);
        assert_eq!((t.x_scale, t.y_scale, t.y_offset), (1.0, 1.0, 0.0));
    }

    #[test]
    fn colony_code_expires_after_its_window() {
        let code = ColonyCode {
            id: 1,
            lobby_id: 7,
            server_address: String::new(),
            colony: 3,
            value: 123456,
            created_at: at(12, 0, 0),
            valid_duration_ms: 600_000,
        };

        assert!(code.is_valid_at(at(12, 9, 59)));
        assert!(!code.is_valid_at(at(12, 10, 0)));
    }

    #[test]
    fn session_validity_is_measured_from_last_check_in() {
        let session = Session {
            id: 1,
            player: 2,
            token: "t".to_string(),
            created_at: at(8, 0, 0),
            valid_duration_ms: 3_600_000,
            last_check_in: at(11, 30, 0),
        };

        assert!(session.is_valid_at(at(12, 29, 0)));
        assert!(!session.is_valid_at(at(12, 31, 0)));
    }

    #[test]
    fn huge_validity_saturates_instead_of_overflowing() {
        let code = ColonyCode {
            id: 1,
            lobby_id: 7,
            server_address: String::new(),
            colony: 3,
            value: 123456,
            created_at: at(12, 0, 0),
            valid_duration_ms: i64::MAX,
        };

        assert_eq!(code.expires_at(), NaiveDateTime::MAX);
        assert!(code.is_valid_at(at(23, 59, 59)));

        let session = Session {
            id: 1,
            player: 2,
            token: "t".to_string(),
            created_at: at(8, 0, 0),
            valid_duration_ms: i64::MAX,
            last_check_in: at(8, 0, 0),
        };

        assert!(session.is_valid_at(at(23, 59, 59)));
    }
}
