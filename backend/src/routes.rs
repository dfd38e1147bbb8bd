use actix_web::{error, web, HttpResponse};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use shared::{
    BatchClassificationRequest, ClassificationRequest, Crop, GrowthStage, TaxonomyResponse,
};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::classifier::assembler::assemble;
use crate::classifier::config::Policy;
use crate::classifier::ingest::ingest_raw;

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Bodies that still fail to deserialize get the same `{"error": ...}` shape as
/// the other rejections instead of actix's plain-text default.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        warn!("Rejected request body: {}", message);
        error::InternalError::from_response(
            err,
            HttpResponse::BadRequest().json(ErrorResponse { error: message }),
        )
        .into()
    })
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/api/classify").route(web::post().to(classify)))
        .service(web::resource("/api/classify/batch").route(web::post().to(classify_batch)))
        .service(web::resource("/api/classify/raw").route(web::post().to(classify_raw)))
        .service(web::resource("/api/taxonomy").route(web::get().to(taxonomy)));
}

async fn classify(
    policy: web::Data<Policy>,
    request: web::Json<ClassificationRequest>,
) -> HttpResponse {
    let result = assemble(&request.candidates, &request.scene, &policy);
    HttpResponse::Ok().json(result.to_response())
}

async fn classify_batch(
    policy: web::Data<Policy>,
    batch: web::Json<BatchClassificationRequest>,
) -> HttpResponse {
    info!("Classifying batch of {} image(s)", batch.requests.len());

    let results: Vec<_> = batch
        .requests
        .iter()
        .map(|request| {
            let result = assemble(&request.candidates, &request.scene, &policy);
            json!({
                "id": Uuid::new_v4(),
                "result": result.to_response()
            })
        })
        .collect();

    HttpResponse::Ok().json(json!({
        "results": results
    }))
}

async fn classify_raw(policy: web::Data<Policy>, body: String) -> HttpResponse {
    match ingest_raw(&body) {
        Ok(request) => {
            let result = assemble(&request.candidates, &request.scene, &policy);
            HttpResponse::Ok().json(result.to_response())
        }
        Err(e) => {
            warn!("Rejected classifier output: {}", e);
            HttpResponse::BadRequest().json(ErrorResponse {
                error: e.to_string(),
            })
        }
    }
}

async fn taxonomy() -> HttpResponse {
    HttpResponse::Ok().json(TaxonomyResponse {
        crops: Crop::iter().map(|crop| crop.to_string()).collect(),
        stages: GrowthStage::iter().map(|stage| stage.to_string()).collect(),
        harvest_crops: Crop::iter()
            .filter(|crop| crop.allows_harvesting())
            .map(|crop| crop.to_string())
            .collect(),
    })
}
