use std::collections::{HashMap, HashSet};

use diesel::{dsl::count_star, prelude::*};

use crate::error::{ApiError, ApiResult};

use super::{
    models::{GraphicalAsset, Lod, LodDetail, NewGraphicalAsset, NewLod},
    schema,
};

/// Rejects assets carrying an inline blob while declaring LODs.
pub fn validate_asset(asset: &NewGraphicalAsset) -> ApiResult<()> {
    if asset.has_lods && asset.blob.is_some() {
        return Err(ApiError::BadRequest(format!(
            "Asset {} declares LODs and must not carry an inline blob",
            asset.alias
        )));
    }

    if asset.width < 0 || asset.height < 0 {
        return Err(ApiError::BadRequest(format!(
            "Asset {} has negative dimensions",
            asset.alias
        )));
    }

    Ok(())
}

pub fn add_asset(conn: &mut PgConnection, asset: NewGraphicalAsset) -> ApiResult<GraphicalAsset> {
    use schema::graphical_assets::dsl::graphical_assets;

    validate_asset(&asset)?;

    Ok(diesel::insert_into(graphical_assets)
        .values(&asset)
        .returning(GraphicalAsset::as_returning())
        .get_result(conn)?)
}

pub fn add_assets(
    conn: &mut PgConnection,
    assets: Vec<NewGraphicalAsset>,
) -> ApiResult<Vec<GraphicalAsset>> {
    use schema::graphical_assets::dsl::graphical_assets;

    for asset in assets.iter() {
        validate_asset(asset)?;
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        Ok(diesel::insert_into(graphical_assets)
            .values(&assets)
            .returning(GraphicalAsset::as_returning())
            .get_results(conn)?)
    })
}

pub fn get_asset(conn: &mut PgConnection, asset_id: i32) -> QueryResult<Option<GraphicalAsset>> {
    use schema::graphical_assets::dsl::graphical_assets;

    graphical_assets
        .find(asset_id)
        .select(GraphicalAsset::as_select())
        .first(conn)
        .optional()
}

pub fn get_assets(conn: &mut PgConnection, ids: &[i32]) -> QueryResult<Vec<GraphicalAsset>> {
    use schema::graphical_assets::dsl::{graphical_assets, id};

    graphical_assets
        .filter(id.eq_any(ids))
        .order(id.asc())
        .select(GraphicalAsset::as_select())
        .load(conn)
}

/// Refuses to turn LODs off while the asset still owns LOD rows.
fn ensure_lods_released(
    conn: &mut PgConnection,
    asset_id: i32,
    asset: &NewGraphicalAsset,
) -> ApiResult<()> {
    use schema::lods::dsl::{graphical_asset, lods};

    if asset.has_lods {
        return Ok(());
    }

    let held: i64 = lods
        .filter(graphical_asset.eq(asset_id))
        .count()
        .get_result(conn)?;

    if held > 0 {
        return Err(ApiError::Conflict(format!(
            "Asset {} still has {} LODs and cannot stop using them",
            asset_id, held
        )));
    }

    Ok(())
}

/// Replaces every field of an existing asset. `None` when the asset does not exist.
pub fn update_asset(
    conn: &mut PgConnection,
    asset_id: i32,
    asset: NewGraphicalAsset,
) -> ApiResult<Option<GraphicalAsset>> {
    use schema::graphical_assets::dsl::{graphical_assets, id};

    validate_asset(&asset)?;

    conn.transaction::<_, ApiError, _>(|conn| {
        let locked: Option<i32> = graphical_assets
            .find(asset_id)
            .select(id)
            .for_update()
            .first(conn)
            .optional()?;

        if locked.is_none() {
            return Ok(None);
        }

        ensure_lods_released(conn, asset_id, &asset)?;

        Ok(diesel::update(graphical_assets.find(asset_id))
            .set(&asset)
            .returning(GraphicalAsset::as_returning())
            .get_result(conn)
            .optional()?)
    })
}

/// All or nothing: `None` when any of the ids is unknown, in which case no
/// asset is modified.
pub fn update_assets(
    conn: &mut PgConnection,
    updates: Vec<(i32, NewGraphicalAsset)>,
) -> ApiResult<Option<Vec<GraphicalAsset>>> {
    use schema::graphical_assets::dsl::{graphical_assets, id};

    for (_, asset) in updates.iter() {
        validate_asset(asset)?;
    }

    let wanted: HashSet<i32> = updates.iter().map(|(asset_id, _)| *asset_id).collect();

    if wanted.len() != updates.len() {
        return Err(ApiError::BadRequest(
            "The same asset is listed more than once".to_string(),
        ));
    }

    let ids: Vec<i32> = wanted.into_iter().collect();

    conn.transaction::<_, ApiError, _>(|conn| {
        let existing: i64 = graphical_assets
            .filter(id.eq_any(&ids))
            .select(count_star())
            .first(conn)?;

        if existing as usize != ids.len() {
            return Ok(None);
        }

        graphical_assets
            .filter(id.eq_any(&ids))
            .select(id)
            .for_update()
            .load::<i32>(conn)?;

        let mut updated = Vec::with_capacity(updates.len());

        for (asset_id, asset) in updates.iter() {
            ensure_lods_released(conn, *asset_id, asset)?;

            updated.push(
                diesel::update(graphical_assets.find(*asset_id))
                    .set(asset)
                    .returning(GraphicalAsset::as_returning())
                    .get_result(conn)?,
            );
        }

        Ok(Some(updated))
    })
}

/// Fails with a foreign key violation while the asset is still used as a
/// sprite or icon.
pub fn delete_asset(conn: &mut PgConnection, asset_id: i32) -> QueryResult<bool> {
    use schema::graphical_assets::dsl::graphical_assets;

    Ok(diesel::delete(graphical_assets.find(asset_id)).execute(conn)? > 0)
}

pub fn delete_assets(conn: &mut PgConnection, ids: &[i32]) -> QueryResult<usize> {
    use schema::graphical_assets::dsl::{graphical_assets, id};

    diesel::delete(graphical_assets.filter(id.eq_any(ids))).execute(conn)
}

/// LOD details of each asset, in the same order as `asset_ids`, each list
/// ordered by detail level.
pub fn lods_for(conn: &mut PgConnection, asset_ids: &[i32]) -> QueryResult<Vec<Vec<LodDetail>>> {
    use schema::lods::dsl::{detail_level, graphical_asset, id, lods};

    let mut grouped: HashMap<i32, Vec<LodDetail>> = HashMap::new();

    for lod in lods
        .filter(graphical_asset.eq_any(asset_ids))
        .order((detail_level.asc(), id.asc()))
        .select(LodDetail::as_select())
        .load(conn)?
    {
        grouped.entry(lod.graphical_asset).or_default().push(lod);
    }

    Ok(asset_ids
        .iter()
        .map(|asset_id| grouped.get(asset_id).cloned().unwrap_or_default())
        .collect())
}

pub fn add_lod(conn: &mut PgConnection, asset_id: i32, lod: NewLod) -> ApiResult<Lod> {
    use schema::lods::dsl::lods;

    if lod.detail_level < 0 {
        return Err(ApiError::BadRequest(
            "Detail level must not be negative".to_string(),
        ));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        use schema::graphical_assets::dsl::graphical_assets;

        let asset = graphical_assets
            .find(asset_id)
            .select(GraphicalAsset::as_select())
            .for_share()
            .first(conn)
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("No asset with id {}", asset_id)))?;

        if !asset.has_lods {
            return Err(ApiError::BadRequest(format!(
                "Asset {} does not use LODs",
                asset_id
            )));
        }

        let lod = NewLod {
            graphical_asset: asset_id,
            ..lod
        };

        match diesel::insert_into(lods)
            .values(&lod)
            .returning(Lod::as_returning())
            .get_result(conn)
        {
            Ok(lod) => Ok(lod),

            Err(e) => match ApiError::from(e) {
                err if err.is_unique_violation() => Err(ApiError::Conflict(format!(
                    "Asset {} already has a LOD at detail level {}",
                    asset_id, lod.detail_level
                ))),
                err => Err(err),
            },
        }
    })
}

/// The LOD together with the MIME type of its asset.
pub fn get_lod(conn: &mut PgConnection, lod_id: i32) -> QueryResult<Option<(Lod, String)>> {
    use schema::graphical_assets::dsl::{graphical_assets, mime_type};
    use schema::lods::dsl::lods;

    lods.find(lod_id)
        .inner_join(graphical_assets)
        .select((Lod::as_select(), mime_type))
        .first(conn)
        .optional()
}

pub fn get_lod_by_level(
    conn: &mut PgConnection,
    asset_id: i32,
    level: i32,
) -> QueryResult<Option<(Lod, String)>> {
    use schema::graphical_assets::dsl::{graphical_assets, mime_type};
    use schema::lods::dsl::{detail_level, graphical_asset, lods};

    lods.filter(graphical_asset.eq(asset_id).and(detail_level.eq(level)))
        .inner_join(graphical_assets)
        .select((Lod::as_select(), mime_type))
        .first(conn)
        .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(has_lods: bool, blob: Option<Vec<u8>>) -> NewGraphicalAsset {
        NewGraphicalAsset {
            alias: "mossy_rock".to_string(),
            mime_type: "image/png".to_string(),
            use_case: "environment".to_string(),
            width: 64,
            height: 48,
            has_lods,
            blob,
        }
    }

    #[test]
    fn lod_assets_cannot_carry_a_blob() {
        assert!(matches!(
            validate_asset(&asset(true, Some(vec![1, 2, 3]))),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn plain_and_lod_assets_validate() {
        assert!(validate_asset(&asset(false, Some(vec![1]))).is_ok());
        assert!(validate_asset(&asset(true, None)).is_ok());
        assert!(validate_asset(&asset(false, None)).is_ok());
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let mut a = asset(false, None);
        a.height = -1;

        assert!(validate_asset(&a).is_err());
    }
}
