use std::collections::HashSet;

use chrono::NaiveDateTime;
use diesel::{
    dsl::sql,
    prelude::*,
    sql_types::{Bool, Timestamp},
};
use rand::Rng;

use crate::error::{ApiError, ApiResult};

use super::{
    collections::insert_transform,
    models::{
        Colony, ColonyAsset, ColonyCode, ColonyLocation, ColonyLocationPath, NewColony,
        NewColonyAsset, NewColonyCode, NewColonyLocation, NewTransform, Transform,
    },
    schema,
};

pub const MIN_CODE: i32 = 100_000;
pub const MAX_CODE: i32 = 999_999;

/// Fresh values drawn before giving up on a unique colony code.
pub const MAX_CODE_ATTEMPTS: usize = 10;

/// Upper bound for a requested code validity, about 49.7 days.
pub const MAX_CODE_VALIDITY_MS: i64 = u32::MAX as i64;

pub const DEFAULT_COLONY_NAME: &str = "New Colony";

/// Code expiry, evaluated by the database against a bound `now`.
const CODE_EXPIRED_SQL: &str =
    "colony_codes.created_at + colony_codes.valid_duration_ms * INTERVAL '1 millisecond' <= ";

#[derive(Debug, Clone, PartialEq)]
pub struct ColonyOverview {
    pub colony: Colony,
    pub asset_ids: Vec<i32>,
    pub location_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColonyDetails {
    pub colony: Colony,
    pub assets: Vec<(ColonyAsset, Transform)>,
    pub locations: Vec<(ColonyLocation, Transform)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocationPlacement {
    pub location: i32,
    pub level: i32,
    pub transform: Option<NewTransform>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetPlacement {
    pub asset_collection: i32,
    pub transform: Option<NewTransform>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateColony {
    pub name: Option<String>,
    pub account_level: Option<i32>,
    pub locations: Vec<LocationPlacement>,
    pub assets: Vec<AssetPlacement>,
}

pub fn random_code<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(MIN_CODE..=MAX_CODE)
}

/// A join code is exactly six ASCII digits.
pub fn parse_code(code: &str) -> Option<i32> {
    if code.len() != 6 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    code.parse().ok()
}

pub fn get_colony(conn: &mut PgConnection, colony_id: i32) -> QueryResult<Option<Colony>> {
    use schema::colonies::dsl::colonies;

    colonies
        .find(colony_id)
        .select(Colony::as_select())
        .first(conn)
        .optional()
}

/// The colony, only when it is owned by `owner_id`.
pub fn colony_for_owner(
    conn: &mut PgConnection,
    colony_id: i32,
    owner_id: i32,
) -> QueryResult<Option<Colony>> {
    use schema::colonies::dsl::{colonies, owner};

    colonies
        .find(colony_id)
        .filter(owner.eq(owner_id))
        .select(Colony::as_select())
        .first(conn)
        .optional()
}

pub fn colony_overview(
    conn: &mut PgConnection,
    colonies: Vec<Colony>,
) -> QueryResult<Vec<ColonyOverview>> {
    use schema::{colony_assets, colony_locations};

    let assets = ColonyAsset::belonging_to(&colonies)
        .order(colony_assets::id.asc())
        .select(ColonyAsset::as_select())
        .load(conn)?
        .grouped_by(&colonies);

    let locations = ColonyLocation::belonging_to(&colonies)
        .order(colony_locations::id.asc())
        .select(ColonyLocation::as_select())
        .load(conn)?
        .grouped_by(&colonies);

    Ok(colonies
        .into_iter()
        .zip(assets)
        .zip(locations)
        .map(|((colony, assets), locations)| ColonyOverview {
            colony,
            asset_ids: assets.iter().map(|a| a.id).collect(),
            location_ids: locations.iter().map(|l| l.id).collect(),
        })
        .collect())
}

pub fn colony_details(conn: &mut PgConnection, colony: Colony) -> QueryResult<ColonyDetails> {
    use schema::{colony_assets, colony_locations, transforms};

    let assets = ColonyAsset::belonging_to(&colony)
        .inner_join(transforms::table)
        .order(colony_assets::id.asc())
        .select((ColonyAsset::as_select(), Transform::as_select()))
        .load(conn)?;

    let locations = ColonyLocation::belonging_to(&colony)
        .inner_join(transforms::table)
        .order(colony_locations::id.asc())
        .select((ColonyLocation::as_select(), Transform::as_select()))
        .load(conn)?;

    Ok(ColonyDetails {
        colony,
        assets,
        locations,
    })
}

/// Creates the colony and its initial placements in one transaction.
pub fn create_colony(
    conn: &mut PgConnection,
    owner_id: i32,
    request: CreateColony,
    now: NaiveDateTime,
) -> ApiResult<ColonyDetails> {
    use schema::{asset_collections, colonies, colony_assets, colony_locations, locations};

    super::players::require_player(conn, owner_id)?;

    let wanted: HashSet<i32> = request.locations.iter().map(|p| p.location).collect();
    let wanted: Vec<i32> = wanted.into_iter().collect();

    let found: Vec<i32> = locations::table
        .filter(locations::id.eq_any(&wanted))
        .select(locations::id)
        .load(conn)?;

    if let Some(missing) = wanted.iter().find(|l| !found.contains(l)) {
        return Err(ApiError::NotFound(format!("No location with id {}", missing)));
    }

    let wanted: HashSet<i32> = request.assets.iter().map(|p| p.asset_collection).collect();
    let wanted: Vec<i32> = wanted.into_iter().collect();

    let found: Vec<i32> = asset_collections::table
        .filter(asset_collections::id.eq_any(&wanted))
        .select(asset_collections::id)
        .load(conn)?;

    if let Some(missing) = wanted.iter().find(|c| !found.contains(c)) {
        return Err(ApiError::NotFound(format!(
            "No asset collection with id {}",
            missing
        )));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let colony = diesel::insert_into(colonies::table)
            .values(&NewColony {
                name: request
                    .name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_COLONY_NAME.to_string()),
                account_level: request.account_level.unwrap_or(0),
                latest_visit: Some(now),
                owner: owner_id,
            })
            .returning(Colony::as_returning())
            .get_result(conn)?;

        let mut placed_locations = Vec::with_capacity(request.locations.len());

        for placement in request.locations {
            let transform = insert_transform(conn, placement.transform)?;

            let location = diesel::insert_into(colony_locations::table)
                .values(&NewColonyLocation {
                    colony: colony.id,
                    location: placement.location,
                    transform: transform.id,
                    level: placement.level,
                })
                .returning(ColonyLocation::as_returning())
                .get_result(conn)?;

            placed_locations.push((location, transform));
        }

        let mut placed_assets = Vec::with_capacity(request.assets.len());

        for placement in request.assets {
            let transform = insert_transform(conn, placement.transform)?;

            let asset = diesel::insert_into(colony_assets::table)
                .values(&NewColonyAsset {
                    asset_collection: placement.asset_collection,
                    transform: transform.id,
                    colony: colony.id,
                })
                .returning(ColonyAsset::as_returning())
                .get_result(conn)?;

            placed_assets.push((asset, transform));
        }

        log::info!(
            "[colonies] Player {} created colony {} with {} locations and {} assets",
            owner_id,
            colony.id,
            placed_locations.len(),
            placed_assets.len()
        );

        Ok(ColonyDetails {
            colony,
            assets: placed_assets,
            locations: placed_locations,
        })
    })
}

/// The code the colony currently points at, if it has not expired.
pub fn active_code(
    conn: &mut PgConnection,
    colony_id: i32,
    now: NaiveDateTime,
) -> QueryResult<Option<ColonyCode>> {
    use schema::colony_codes::dsl::colony_codes;

    let Some(colony) = get_colony(conn, colony_id)? else {
        return Ok(None);
    };

    let Some(code_id) = colony.colony_code else {
        return Ok(None);
    };

    Ok(colony_codes
        .find(code_id)
        .select(ColonyCode::as_select())
        .first(conn)
        .optional()?
        .filter(|code| code.is_valid_at(now)))
}

/// Outcome of opening a colony.
#[derive(Debug, Clone, PartialEq)]
pub enum IssuedCode {
    /// A new code was stored for the given lobby.
    Fresh(ColonyCode),
    /// The colony already had a valid code when its row was locked.
    Existing(ColonyCode),
}

impl IssuedCode {
    pub fn code(&self) -> &ColonyCode {
        match self {
            IssuedCode::Fresh(code) | IssuedCode::Existing(code) => code,
        }
    }

    pub fn into_code(self) -> ColonyCode {
        match self {
            IssuedCode::Fresh(code) | IssuedCode::Existing(code) => code,
        }
    }
}

pub fn check_code_validity(valid_duration_ms: i64) -> ApiResult<()> {
    if !(1..=MAX_CODE_VALIDITY_MS).contains(&valid_duration_ms) {
        return Err(ApiError::BadRequest(format!(
            "Code validity must be between 1 and {} milliseconds, got {}",
            MAX_CODE_VALIDITY_MS, valid_duration_ms
        )));
    }

    Ok(())
}

/// Stores a fresh join code for the colony and points the colony at it.
/// The colony row is locked first; if it already points at a valid code that
/// code is returned untouched. Expired codes of the colony are removed in the
/// same transaction. A value collision is retried with a new value up to
/// `MAX_CODE_ATTEMPTS` times.
pub fn insert_code_for(
    conn: &mut PgConnection,
    colony_id: i32,
    lobby_id: i32,
    server_address: &str,
    valid_duration_ms: i64,
    now: NaiveDateTime,
) -> ApiResult<IssuedCode> {
    use schema::colonies::dsl::{colonies, colony_code, latest_visit};
    use schema::colony_codes::dsl::{colony, colony_codes};

    check_code_validity(valid_duration_ms)?;

    let mut rng = rand::thread_rng();

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let candidate = random_code(&mut rng);

        let result = conn.transaction::<_, ApiError, _>(|conn| {
            let current: Option<i32> = colonies
                .find(colony_id)
                .select(colony_code)
                .for_update()
                .first::<Option<i32>>(conn)
                .optional()?
                .ok_or_else(|| ApiError::NotFound(format!("No colony with id {}", colony_id)))?;

            if let Some(code_id) = current {
                let existing = colony_codes
                    .find(code_id)
                    .select(ColonyCode::as_select())
                    .first(conn)
                    .optional()?
                    .filter(|code| code.is_valid_at(now));

                if let Some(code) = existing {
                    return Ok(IssuedCode::Existing(code));
                }
            }

            diesel::delete(
                colony_codes
                    .filter(colony.eq(colony_id))
                    .filter(sql::<Bool>(CODE_EXPIRED_SQL).bind::<Timestamp, _>(now)),
            )
            .execute(conn)?;

            let code = diesel::insert_into(colony_codes)
                .values(&NewColonyCode {
                    lobby_id,
                    server_address: server_address.to_string(),
                    colony: colony_id,
                    value: candidate,
                    created_at: now,
                    valid_duration_ms,
                })
                .returning(ColonyCode::as_returning())
                .get_result(conn)?;

            diesel::update(colonies.find(colony_id))
                .set((colony_code.eq(Some(code.id)), latest_visit.eq(Some(now))))
                .execute(conn)?;

            Ok(IssuedCode::Fresh(code))
        });

        match result {
            Ok(issued) => return Ok(issued),

            Err(e) if e.is_unique_violation() => {
                log::debug!(
                    "[colonies] Code collision for colony {} (attempt {}/{})",
                    colony_id,
                    attempt,
                    MAX_CODE_ATTEMPTS
                );
            }

            Err(e) => return Err(e),
        }
    }

    Err(ApiError::Internal(format!(
        "Failed to generate a unique colony code after {} attempts",
        MAX_CODE_ATTEMPTS
    )))
}

/// Detaches and removes every code of the colony. `false` when the colony
/// does not exist or is not owned by `owner_id`.
pub fn close_colony(conn: &mut PgConnection, colony_id: i32, owner_id: i32) -> ApiResult<bool> {
    use schema::colonies::dsl::{colonies, colony_code};
    use schema::colony_codes::dsl::{colony, colony_codes};

    conn.transaction::<_, ApiError, _>(|conn| {
        if colony_for_owner(conn, colony_id, owner_id)?.is_none() {
            return Ok(false);
        }

        diesel::update(colonies.find(colony_id))
            .set(colony_code.eq(None::<i32>))
            .execute(conn)?;

        let removed = diesel::delete(colony_codes.filter(colony.eq(colony_id))).execute(conn)?;

        log::info!(
            "[colonies] Closed colony {} ({} codes removed)",
            colony_id,
            removed
        );

        Ok(true)
    })
}

/// The code with the given value and the owner of its colony.
pub fn find_code(conn: &mut PgConnection, code: i32) -> QueryResult<Option<(ColonyCode, i32)>> {
    use schema::colonies::dsl::{colonies, owner};
    use schema::colony_codes::dsl::{colony_codes, value};

    colony_codes
        .inner_join(colonies)
        .filter(value.eq(code))
        .select((ColonyCode::as_select(), owner))
        .first(conn)
        .optional()
}

pub fn delete_code(conn: &mut PgConnection, code_id: i32) -> QueryResult<bool> {
    use schema::colony_codes::dsl::colony_codes;

    Ok(diesel::delete(colony_codes.find(code_id)).execute(conn)? > 0)
}

pub fn update_latest_visit(
    conn: &mut PgConnection,
    colony_id: i32,
    visit: NaiveDateTime,
) -> QueryResult<Option<Colony>> {
    use schema::colonies::dsl::{colonies, latest_visit};

    diesel::update(colonies.find(colony_id))
        .set(latest_visit.eq(Some(visit)))
        .returning(Colony::as_returning())
        .get_result(conn)
        .optional()
}

pub fn path_graph(
    conn: &mut PgConnection,
    colony_id: i32,
) -> QueryResult<Vec<ColonyLocationPath>> {
    use schema::colony_location_paths::dsl::{colony, colony_location_paths, id};

    colony_location_paths
        .filter(colony.eq(colony_id))
        .order(id.asc())
        .select(ColonyLocationPath::as_select())
        .load(conn)
}

pub fn delete_expired_codes(conn: &mut PgConnection, now: NaiveDateTime) -> QueryResult<usize> {
    use schema::colony_codes::dsl::colony_codes;

    diesel::delete(colony_codes.filter(sql::<Bool>(CODE_EXPIRED_SQL).bind::<Timestamp, _>(now)))
        .execute(conn)
}
