use actix_web::{delete, get, post, put, web, HttpResponse};
use diesel::PgConnection;

use crate::{
    db::{
        assets,
        models::{GraphicalAsset, NewGraphicalAsset, NewLod},
    },
    error::{ApiError, ApiResult},
    types::{
        parse_id_list, AssetRequest, AssetResponse, AssetUpdateRequest, DeletedResponse,
        IdListQuery, LodCreatedResponse, LodRequest,
    },
};

use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_asset)
        .service(get_assets)
        .service(add_asset)
        .service(add_assets)
        .service(update_asset)
        .service(update_assets)
        .service(delete_asset)
        .service(delete_assets)
        .service(add_lod);
}

fn with_lods(
    conn: &mut PgConnection,
    found: Vec<GraphicalAsset>,
) -> ApiResult<Vec<AssetResponse>> {
    let ids: Vec<i32> = found.iter().map(|a| a.id).collect();

    let lods = assets::lods_for(conn, &ids)?;

    Ok(found
        .into_iter()
        .zip(lods)
        .map(|(asset, lods)| AssetResponse::new(asset, lods))
        .collect())
}

#[get("/asset/{id}")]
pub async fn get_asset(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let asset_id = path.into_inner();

    let mut response = state
        .run(move |conn| {
            let asset = assets::get_asset(conn, asset_id)?
                .ok_or_else(|| ApiError::NotFound(format!("No asset with id {}", asset_id)))?;

            with_lods(conn, vec![asset])
        })
        .await?;

    match response.pop() {
        Some(asset) => Ok(HttpResponse::Ok().json(asset)),
        None => Err(ApiError::NotFound(format!("No asset with id {}", asset_id))),
    }
}

#[get("/assets")]
pub async fn get_assets(
    state: web::Data<AppState>,
    query: web::Query<IdListQuery>,
) -> ApiResult<HttpResponse> {
    let ids = parse_id_list(&query.ids)?;

    let response = state
        .run(move |conn| {
            let found = assets::get_assets(conn, &ids)?;

            with_lods(conn, found)
        })
        .await?;

    if response.is_empty() {
        return Err(ApiError::NotFound("No assets found".to_string()));
    }

    Ok(HttpResponse::Ok().json(response))
}

#[post("/asset")]
pub async fn add_asset(
    state: web::Data<AppState>,
    body: web::Json<AssetRequest>,
) -> ApiResult<HttpResponse> {
    let asset: NewGraphicalAsset = body.into_inner().into();

    assets::validate_asset(&asset)?;

    let mut created = state
        .run(move |conn| {
            let created = assets::add_asset(conn, asset)?;

            with_lods(conn, vec![created])
        })
        .await?;

    match created.pop() {
        Some(asset) => Ok(HttpResponse::Created().json(asset)),
        None => Err(ApiError::Internal("Created asset was not returned".to_string())),
    }
}

#[post("/assets")]
pub async fn add_assets(
    state: web::Data<AppState>,
    body: web::Json<Vec<AssetRequest>>,
) -> ApiResult<HttpResponse> {
    let new_assets: Vec<NewGraphicalAsset> =
        body.into_inner().into_iter().map(Into::into).collect();

    for asset in new_assets.iter() {
        assets::validate_asset(asset)?;
    }

    let created = state
        .run(move |conn| {
            let created = assets::add_assets(conn, new_assets)?;

            with_lods(conn, created)
        })
        .await?;

    Ok(HttpResponse::Created().json(created))
}

#[put("/asset/{id}")]
pub async fn update_asset(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<AssetRequest>,
) -> ApiResult<HttpResponse> {
    let asset_id = path.into_inner();
    let asset: NewGraphicalAsset = body.into_inner().into();

    assets::validate_asset(&asset)?;

    let mut updated = state
        .run(move |conn| match assets::update_asset(conn, asset_id, asset)? {
            Some(updated) => with_lods(conn, vec![updated]),
            None => Ok(Vec::new()),
        })
        .await?;

    match updated.pop() {
        Some(asset) => Ok(HttpResponse::Ok().json(asset)),
        None => Err(ApiError::NotFound(format!("No asset with id {}", asset_id))),
    }
}

#[put("/assets")]
pub async fn update_assets(
    state: web::Data<AppState>,
    body: web::Json<Vec<AssetUpdateRequest>>,
) -> ApiResult<HttpResponse> {
    let updates: Vec<(i32, NewGraphicalAsset)> = body
        .into_inner()
        .into_iter()
        .map(|u| (u.id, u.asset.into()))
        .collect();

    for (_, asset) in updates.iter() {
        assets::validate_asset(asset)?;
    }

    let updated = state
        .run(move |conn| match assets::update_assets(conn, updates)? {
            Some(updated) => Ok(Some(with_lods(conn, updated)?)),
            None => Ok(None),
        })
        .await?;

    match updated {
        Some(updated) => Ok(HttpResponse::Ok().json(updated)),
        None => Err(ApiError::NotFound(
            "One or more assets do not exist".to_string(),
        )),
    }
}

#[delete("/asset/{id}")]
pub async fn delete_asset(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let asset_id = path.into_inner();

    let deleted = state
        .run(move |conn| Ok(assets::delete_asset(conn, asset_id)?))
        .await?;

    if !deleted {
        return Err(ApiError::NotFound(format!("No asset with id {}", asset_id)));
    }

    log::info!("[Server] Deleted asset {}", asset_id);

    Ok(HttpResponse::NoContent().finish())
}

#[delete("/assets")]
pub async fn delete_assets(
    state: web::Data<AppState>,
    query: web::Query<IdListQuery>,
) -> ApiResult<HttpResponse> {
    let ids = parse_id_list(&query.ids)?;

    let deleted = state
        .run(move |conn| Ok(assets::delete_assets(conn, &ids)?))
        .await?;

    Ok(HttpResponse::Ok().json(DeletedResponse { deleted }))
}

#[post("/asset/{id}/lod")]
pub async fn add_lod(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<LodRequest>,
) -> ApiResult<HttpResponse> {
    let asset_id = path.into_inner();
    let LodRequest { detail_level, blob } = body.into_inner();

    let blob = blob.ok_or_else(|| ApiError::BadRequest("A LOD requires a blob".to_string()))?;

    let lod = state
        .run(move |conn| {
            assets::add_lod(
                conn,
                asset_id,
                NewLod {
                    detail_level,
                    blob,
                    graphical_asset: asset_id,
                },
            )
        })
        .await?;

    Ok(HttpResponse::Created().json(LodCreatedResponse {
        id: lod.id,
        detail_level: lod.detail_level,
        graphical_asset: lod.graphical_asset,
    }))
}
