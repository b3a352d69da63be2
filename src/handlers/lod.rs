use actix_web::{
    get,
    http::header::{self, HeaderValue},
    web, HttpRequest, HttpResponse,
};
use sha2::{Digest, Sha256};

use crate::{
    db::{assets, models::Lod},
    error::{ApiError, ApiResult},
    types::LodByLevelQuery,
};

use super::AppState;

pub const DETAIL_LEVEL_HEADER: &str = "URSA-DETAIL-LEVEL";
pub const ASSET_ID_HEADER: &str = "URSA-ASSET-ID";

/// LOD blobs never change once stored.
const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_lod_by_level).service(get_lod);
}

pub fn etag_for(blob: &[u8]) -> String {
    format!("\"{:x}\"", Sha256::digest(blob))
}

fn matches_etag(req: &HttpRequest, etag: &str) -> bool {
    req.headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(',').any(|tag| tag.trim() == etag || tag.trim() == "*"))
        .unwrap_or(false)
}

fn lod_response(req: &HttpRequest, lod: Lod, mime_type: String) -> HttpResponse {
    let etag = etag_for(&lod.blob);
    let not_modified = matches_etag(req, &etag);

    let mut response = if not_modified {
        HttpResponse::NotModified()
    } else {
        HttpResponse::Ok()
    };

    response
        .insert_header((DETAIL_LEVEL_HEADER, lod.detail_level.to_string()))
        .insert_header((ASSET_ID_HEADER, lod.graphical_asset.to_string()))
        .insert_header((header::ETAG, etag))
        .insert_header((
            header::CACHE_CONTROL,
            HeaderValue::from_static(IMMUTABLE_CACHE_CONTROL),
        ));

    if not_modified {
        return response.finish();
    }

    response
        .insert_header((header::CONTENT_TYPE, mime_type))
        .body(lod.blob)
}

#[get("/lod/{id}")]
pub async fn get_lod(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> ApiResult<HttpResponse> {
    let lod_id = path.into_inner();

    let (lod, mime_type) = state
        .run(move |conn| {
            assets::get_lod(conn, lod_id)?
                .ok_or_else(|| ApiError::NotFound(format!("No LOD with id {}", lod_id)))
        })
        .await?;

    Ok(lod_response(&req, lod, mime_type))
}

#[get("/lod")]
pub async fn get_lod_by_level(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<LodByLevelQuery>,
) -> ApiResult<HttpResponse> {
    let LodByLevelQuery {
        asset_id,
        detail_level,
    } = query.into_inner();

    let (lod, mime_type) = state
        .run(move |conn| {
            assets::get_lod_by_level(conn, asset_id, detail_level)?.ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No LOD at detail level {} for asset {}",
                    detail_level, asset_id
                ))
            })
        })
        .await?;

    Ok(lod_response(&req, lod, mime_type))
}
