use diesel::prelude::*;

use crate::error::{ApiError, ApiResult};

use super::{
    models::{
        AssetCollection, AssetSummary, CollectionEntry, Location, NewAssetCollection,
        NewCollectionEntry, NewTransform, Transform,
    },
    schema,
};

pub const UNNAMED_COLLECTION: &str = "DATA.UNNAMED.COLLECTION";

pub type CollectionContents = (AssetCollection, Vec<(CollectionEntry, Transform, AssetSummary)>);

pub fn get_collection(
    conn: &mut PgConnection,
    collection_id: i32,
) -> QueryResult<Option<AssetCollection>> {
    use schema::asset_collections::dsl::asset_collections;

    asset_collections
        .find(collection_id)
        .select(AssetCollection::as_select())
        .first(conn)
        .optional()
}

/// A collection derived from `original` is never itself an original.
pub fn create_collection(
    conn: &mut PgConnection,
    name: Option<String>,
    original: Option<i32>,
) -> ApiResult<AssetCollection> {
    use schema::asset_collections::dsl::asset_collections;

    if let Some(original_id) = original {
        if get_collection(conn, original_id)?.is_none() {
            return Err(ApiError::NotFound(format!(
                "No asset collection with id {}",
                original_id
            )));
        }
    }

    let collection = NewAssetCollection {
        name: name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| UNNAMED_COLLECTION.to_string()),
        is_original: original.is_none(),
        original,
    };

    Ok(diesel::insert_into(asset_collections)
        .values(&collection)
        .returning(AssetCollection::as_returning())
        .get_result(conn)?)
}

/// Inserts a transform for the placement, the identity one when none is given.
pub fn insert_transform(
    conn: &mut PgConnection,
    transform: Option<NewTransform>,
) -> QueryResult<Transform> {
    use schema::transforms::dsl::transforms;

    diesel::insert_into(transforms)
        .values(&transform.unwrap_or_default())
        .returning(Transform::as_returning())
        .get_result(conn)
}

pub fn add_entry(
    conn: &mut PgConnection,
    collection_id: i32,
    asset_id: i32,
    transform: Option<NewTransform>,
) -> ApiResult<(CollectionEntry, Transform)> {
    use schema::collection_entries::dsl::collection_entries;

    if get_collection(conn, collection_id)?.is_none() {
        return Err(ApiError::NotFound(format!(
            "No asset collection with id {}",
            collection_id
        )));
    }

    if super::assets::get_asset(conn, asset_id)?.is_none() {
        return Err(ApiError::NotFound(format!("No asset with id {}", asset_id)));
    }

    conn.transaction::<_, ApiError, _>(|conn| {
        let transform = insert_transform(conn, transform)?;

        let entry = diesel::insert_into(collection_entries)
            .values(&NewCollectionEntry {
                transform: transform.id,
                asset_collection: collection_id,
                graphical_asset: asset_id,
            })
            .returning(CollectionEntry::as_returning())
            .get_result(conn)?;

        Ok((entry, transform))
    })
}

/// The collection and its entries ordered by entry id.
pub fn collection_with_entries(
    conn: &mut PgConnection,
    collection_id: i32,
) -> QueryResult<Option<CollectionContents>> {
    use schema::collection_entries::dsl::{asset_collection, collection_entries, id};
    use schema::{graphical_assets, transforms};

    let Some(collection) = get_collection(conn, collection_id)? else {
        return Ok(None);
    };

    let entries = collection_entries
        .inner_join(transforms::table)
        .inner_join(graphical_assets::table)
        .filter(asset_collection.eq(collection_id))
        .order(id.asc())
        .select((
            CollectionEntry::as_select(),
            Transform::as_select(),
            AssetSummary::as_select(),
        ))
        .load(conn)?;

    Ok(Some((collection, entries)))
}

pub fn get_location(conn: &mut PgConnection, location_id: i32) -> QueryResult<Option<Location>> {
    use schema::locations::dsl::locations;

    locations
        .find(location_id)
        .select(Location::as_select())
        .first(conn)
        .optional()
}
