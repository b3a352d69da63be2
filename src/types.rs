use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    db::{
        colonies::{AssetPlacement, ColonyDetails, ColonyOverview, CreateColony, LocationPlacement},
        models::{
            Achievement, AssetCollection, AssetSummary, CollectionEntry, ColonyAsset, ColonyCode,
            ColonyLocation, ColonyLocationPath, GraphicalAsset, Location, LodDetail, MiniGame,
            MiniGameDifficulty, NewGraphicalAsset, NewTransform, Player, Preference, Transform,
        },
    },
    error::ApiError,
};

pub type PlayerId = i32;
pub type ColonyId = i32;

/// Base64 (standard alphabet, padded) encoding of binary fields in JSON bodies.
pub mod base64_blob {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(blob: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
        match blob {
            Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(D::Error::custom),
            None => Ok(None),
        }
    }
}

/// Parses a comma separated id list such as `1,2,3`.
pub fn parse_id_list(raw: &str) -> Result<Vec<i32>, ApiError> {
    let ids = raw
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>()
                .map_err(|_| ApiError::BadRequest(format!("Error in parsing id {}", part)))
        })
        .collect::<Result<Vec<i32>, ApiError>>()?;

    if ids.is_empty() {
        return Err(ApiError::BadRequest("No ids given".to_string()));
    }

    Ok(ids)
}

fn as_utc(timestamp: NaiveDateTime) -> DateTime<Utc> {
    timestamp.and_utc()
}

#[derive(Debug, Deserialize)]
pub struct IdListQuery {
    pub ids: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LodDetailsResponse {
    pub id: i32,
    pub detail_level: i32,
}

impl From<LodDetail> for LodDetailsResponse {
    fn from(lod: LodDetail) -> Self {
        Self {
            id: lod.id,
            detail_level: lod.detail_level,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: i32,
    pub alias: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub use_case: String,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "hasLODs")]
    pub has_lods: bool,
    #[serde(with = "base64_blob")]
    pub blob: Option<Vec<u8>>,
    #[serde(rename = "LODs")]
    pub lods: Vec<LodDetailsResponse>,
}

impl AssetResponse {
    pub fn new(asset: GraphicalAsset, lods: Vec<LodDetail>) -> Self {
        Self {
            id: asset.id,
            alias: asset.alias,
            mime_type: asset.mime_type,
            use_case: asset.use_case,
            width: asset.width,
            height: asset.height,
            has_lods: asset.has_lods,
            blob: asset.blob,
            lods: lods.into_iter().map(LodDetailsResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetRequest {
    pub alias: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub use_case: String,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "hasLODs", default)]
    pub has_lods: bool,
    #[serde(with = "base64_blob", default)]
    pub blob: Option<Vec<u8>>,
}

impl From<AssetRequest> for NewGraphicalAsset {
    fn from(request: AssetRequest) -> Self {
        Self {
            alias: request.alias,
            mime_type: request.mime_type,
            use_case: request.use_case,
            width: request.width,
            height: request.height,
            has_lods: request.has_lods,
            blob: request.blob,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AssetUpdateRequest {
    pub id: i32,
    #[serde(flatten)]
    pub asset: AssetRequest,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LodRequest {
    pub detail_level: i32,
    #[serde(with = "base64_blob")]
    pub blob: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LodCreatedResponse {
    pub id: i32,
    pub detail_level: i32,
    pub graphical_asset: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LodByLevelQuery {
    pub asset_id: i32,
    pub detail_level: i32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub id: i32,
    pub z_index: i32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_scale: f32,
    pub y_scale: f32,
}

impl From<Transform> for TransformResponse {
    fn from(t: Transform) -> Self {
        Self {
            id: t.id,
            z_index: t.z_index,
            x_offset: t.x_offset,
            y_offset: t.y_offset,
            x_scale: t.x_scale,
            y_scale: t.y_scale,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MinimizedAssetResponse {
    pub id: i32,
    pub alias: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    pub width: i32,
    pub height: i32,
    #[serde(rename = "hasLODs")]
    pub has_lods: bool,
    #[serde(rename = "LODs")]
    pub lods: Vec<LodDetailsResponse>,
}

impl MinimizedAssetResponse {
    pub fn new(asset: AssetSummary, lods: Vec<LodDetail>) -> Self {
        Self {
            id: asset.id,
            alias: asset.alias,
            mime_type: asset.mime_type,
            width: asset.width,
            height: asset.height,
            has_lods: asset.has_lods,
            lods: lods.into_iter().map(LodDetailsResponse::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntryResponse {
    pub id: i32,
    pub asset_id: i32,
    pub transform: TransformResponse,
    pub asset: MinimizedAssetResponse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResponse {
    pub id: i32,
    pub name: String,
    pub is_original: bool,
    pub original: Option<i32>,
    pub entries: Vec<CollectionEntryResponse>,
}

impl CollectionResponse {
    /// `lods` holds the LOD details of each entry's asset, in entry order.
    pub fn new(
        collection: AssetCollection,
        entries: Vec<(CollectionEntry, Transform, AssetSummary)>,
        lods: Vec<Vec<LodDetail>>,
    ) -> Self {
        Self {
            id: collection.id,
            name: collection.name,
            is_original: collection.is_original,
            original: collection.original,
            entries: entries
                .into_iter()
                .zip(lods)
                .map(|((entry, transform, asset), lods)| CollectionEntryResponse {
                    id: entry.id,
                    asset_id: entry.graphical_asset,
                    transform: transform.into(),
                    asset: MinimizedAssetResponse::new(asset, lods),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CreateCollectionRequest {
    pub name: Option<String>,
    pub original: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AddEntryRequest {
    pub asset: i32,
    pub transform: Option<NewTransform>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EntryCreatedResponse {
    pub id: i32,
    pub asset_id: i32,
    pub collection: i32,
    pub transform: TransformResponse,
}

impl From<(CollectionEntry, Transform)> for EntryCreatedResponse {
    fn from((entry, transform): (CollectionEntry, Transform)) -> Self {
        Self {
            id: entry.id,
            asset_id: entry.graphical_asset,
            collection: entry.asset_collection,
            transform: transform.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub level: i32,
    pub asset_collection: i32,
    pub minigame: Option<i32>,
}

impl From<Location> for LocationResponse {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            name: l.name,
            description: l.description,
            level: l.level,
            asset_collection: l.asset_collection,
            minigame: l.minigame,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DifficultyResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub required_level: i32,
    pub overwriting_settings: Value,
}

impl From<MiniGameDifficulty> for DifficultyResponse {
    fn from(d: MiniGameDifficulty) -> Self {
        Self {
            id: d.id,
            name: d.name,
            description: d.description,
            icon: d.icon,
            required_level: d.required_level,
            overwriting_settings: d.overwriting_settings,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MinigameResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<i32>,
    pub settings: Value,
    pub difficulties: Vec<DifficultyResponse>,
}

impl MinigameResponse {
    pub fn new(minigame: MiniGame, difficulties: Vec<MiniGameDifficulty>) -> Self {
        Self {
            id: minigame.id,
            name: minigame.name,
            description: minigame.description,
            icon: minigame.icon,
            settings: minigame.settings,
            difficulties: difficulties.into_iter().map(DifficultyResponse::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MinimizedMinigameQuery {
    pub minigame: i32,
    pub difficulty: i32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MinimizedMinigameResponse {
    pub settings: Value,
    pub overwriting_settings: Value,
    pub effective_settings: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerResponse {
    pub id: PlayerId,
    #[serde(rename = "IGN")]
    pub ign: String,
    pub sprite: Option<i32>,
    pub achievements: Vec<i32>,
    pub has_completed_tutorial: bool,
}

impl PlayerResponse {
    pub fn new(player: Player, achievements: &[Achievement]) -> Self {
        Self {
            id: player.id,
            ign: player.ign,
            sprite: player.sprite,
            achievements: achievements.iter().map(|a| a.id).collect(),
            has_completed_tutorial: crate::db::players::has_completed_tutorial(achievements),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceResponse {
    pub id: i32,
    pub key: String,
    pub chosen_value: String,
    pub available_values: Vec<String>,
}

impl From<Preference> for PreferenceResponse {
    fn from(p: Preference) -> Self {
        Self {
            id: p.id,
            key: p.preference_key,
            chosen_value: p.chosen_value,
            available_values: p.available_values,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferencesResponse {
    pub preferences: Vec<PreferenceResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColonyOverviewResponse {
    pub id: ColonyId,
    pub name: String,
    pub acc_level: i32,
    pub latest_visit: Option<DateTime<Utc>>,
    pub assets: Vec<i32>,
    pub locations: Vec<i32>,
}

impl From<ColonyOverview> for ColonyOverviewResponse {
    fn from(overview: ColonyOverview) -> Self {
        Self {
            id: overview.colony.id,
            name: overview.colony.name,
            acc_level: overview.colony.account_level,
            latest_visit: overview.colony.latest_visit.map(as_utc),
            assets: overview.asset_ids,
            locations: overview.location_ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ColoniesResponse {
    pub colonies: Vec<ColonyOverviewResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColonyAssetResponse {
    pub id: i32,
    pub asset_collection: i32,
    pub transform: TransformResponse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColonyLocationResponse {
    pub id: i32,
    pub location: i32,
    pub level: i32,
    pub transform: TransformResponse,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColonyInfoResponse {
    pub id: ColonyId,
    pub name: String,
    pub acc_level: i32,
    pub latest_visit: Option<DateTime<Utc>>,
    pub owner: PlayerId,
    pub assets: Vec<ColonyAssetResponse>,
    pub locations: Vec<ColonyLocationResponse>,
}

impl From<ColonyDetails> for ColonyInfoResponse {
    fn from(details: ColonyDetails) -> Self {
        Self {
            id: details.colony.id,
            name: details.colony.name,
            acc_level: details.colony.account_level,
            latest_visit: details.colony.latest_visit.map(as_utc),
            owner: details.colony.owner,
            assets: details
                .assets
                .into_iter()
                .map(|(asset, transform): (ColonyAsset, Transform)| ColonyAssetResponse {
                    id: asset.id,
                    asset_collection: asset.asset_collection,
                    transform: transform.into(),
                })
                .collect(),
            locations: details
                .locations
                .into_iter()
                .map(
                    |(location, transform): (ColonyLocation, Transform)| ColonyLocationResponse {
                        id: location.id,
                        location: location.location,
                        level: location.level,
                        transform: transform.into(),
                    },
                )
                .collect(),
        }
    }
}

fn first_level() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocationPlacementRequest {
    pub location: i32,
    #[serde(default = "first_level")]
    pub level: i32,
    pub transform: Option<NewTransform>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetPlacementRequest {
    pub asset_collection: i32,
    pub transform: Option<NewTransform>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateColonyRequest {
    pub name: Option<String>,
    pub acc_level: Option<i32>,
    pub locations: Vec<LocationPlacementRequest>,
    pub assets: Vec<AssetPlacementRequest>,
}

impl From<CreateColonyRequest> for CreateColony {
    fn from(request: CreateColonyRequest) -> Self {
        Self {
            name: request.name,
            account_level: request.acc_level,
            locations: request
                .locations
                .into_iter()
                .map(|p| LocationPlacement {
                    location: p.location,
                    level: p.level,
                    transform: p.transform,
                })
                .collect(),
            assets: request
                .assets
                .into_iter()
                .map(|p| AssetPlacement {
                    asset_collection: p.asset_collection,
                    transform: p.transform,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenColonyQuery {
    pub player_id: PlayerId,
    pub valid_duration_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OpenColonyResponse {
    pub code: String,
    pub lobby_id: i32,
    pub multiplayer_server_address: String,
}

impl From<&ColonyCode> for OpenColonyResponse {
    fn from(code: &ColonyCode) -> Self {
        Self {
            code: format!("{:06}", code.value),
            lobby_id: code.lobby_id,
            multiplayer_server_address: code.server_address.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColonyCodeResponse {
    pub code: String,
    pub lobby_id: i32,
    pub multiplayer_server_address: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&ColonyCode> for ColonyCodeResponse {
    fn from(code: &ColonyCode) -> Self {
        Self {
            code: format!("{:06}", code.value),
            lobby_id: code.lobby_id,
            multiplayer_server_address: code.server_address.to_owned(),
            expires_at: as_utc(code.expires_at()),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinColonyResponse {
    pub lobby_id: i32,
    pub multiplayer_server_address: String,
    pub owner: PlayerId,
    pub colony_id: ColonyId,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CloseColonyRequest {
    pub player_id: PlayerId,
}

/// Body of `POST /session`. `userIdentifier` is the player's reference at
/// the identity provider; the remaining fields only name new players.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    pub user_identifier: String,
    #[serde(rename = "IGN", default)]
    pub ign: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl SessionRequest {
    /// Trimmed reference, rejecting blank identifiers.
    pub fn reference(&self) -> Result<&str, ApiError> {
        let reference = self.user_identifier.trim();

        if reference.is_empty() {
            return Err(ApiError::BadRequest(
                "userIdentifier must not be empty".to_string(),
            ));
        }

        Ok(reference)
    }

    /// In-game name for a new player: `IGN`, else first and last name, else
    /// the reference itself.
    pub fn display_name(&self) -> String {
        let non_blank = |s: &Option<String>| {
            s.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(ign) = non_blank(&self.ign) {
            return ign;
        }

        let full = [non_blank(&self.first_name), non_blank(&self.last_name)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            return full;
        }

        self.user_identifier.trim().to_string()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SessionResponse {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LatestVisit {
    pub latest_visit: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathResponse {
    pub from: i32,
    pub to: i32,
}

impl From<ColonyLocationPath> for PathResponse {
    fn from(path: ColonyLocationPath) -> Self {
        Self {
            from: path.location_a,
            to: path.location_b,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PathGraphResponse {
    pub paths: Vec<PathResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeletedResponse {
    pub deleted: usize,
}
