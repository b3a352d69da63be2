use actix_web::{get, post, web, HttpResponse};

use crate::{
    db::{assets, collections},
    error::{ApiError, ApiResult},
    types::{
        AddEntryRequest, CollectionResponse, CreateCollectionRequest, EntryCreatedResponse,
        LocationResponse,
    },
};

use super::AppState;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_collection)
        .service(create_collection)
        .service(add_entry)
        .service(get_location);
}

#[get("/collection/{id}")]
pub async fn get_collection(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let collection_id = path.into_inner();

    let response = state
        .run(move |conn| {
            let (collection, entries) = collections::collection_with_entries(conn, collection_id)?
                .ok_or_else(|| {
                    ApiError::NotFound(format!("No asset collection with id {}", collection_id))
                })?;

            let asset_ids: Vec<i32> = entries.iter().map(|(_, _, asset)| asset.id).collect();

            let lods = assets::lods_for(conn, &asset_ids)?;

            Ok(CollectionResponse::new(collection, entries, lods))
        })
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

#[post("/collection")]
pub async fn create_collection(
    state: web::Data<AppState>,
    body: web::Json<CreateCollectionRequest>,
) -> ApiResult<HttpResponse> {
    let CreateCollectionRequest { name, original } = body.into_inner();

    let collection = state
        .run(move |conn| collections::create_collection(conn, name, original))
        .await?;

    Ok(HttpResponse::Created().json(CollectionResponse::new(collection, Vec::new(), Vec::new())))
}

#[post("/collection/{id}/entry")]
pub async fn add_entry(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<AddEntryRequest>,
) -> ApiResult<HttpResponse> {
    let collection_id = path.into_inner();
    let AddEntryRequest { asset, transform } = body.into_inner();

    let created = state
        .run(move |conn| collections::add_entry(conn, collection_id, asset, transform))
        .await?;

    Ok(HttpResponse::Created().json(EntryCreatedResponse::from(created)))
}

#[get("/location/{id}")]
pub async fn get_location(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let location_id = path.into_inner();

    let location = state
        .run(move |conn| {
            collections::get_location(conn, location_id)?
                .ok_or_else(|| ApiError::NotFound(format!("No location with id {}", location_id)))
        })
        .await?;

    Ok(HttpResponse::Ok().json(LocationResponse::from(location)))
}
