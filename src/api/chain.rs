use actix_web::{HttpResponse, Responder, get, post, web};
use log::{info, warn};

use super::models::{AppState, BlockResponse, SubmitBlockResponse};
use crate::blockchain::Block;

/// Any stored block by hash, canonical or not.
#[get("/blocks/hash/{hash}/")]
pub async fn get_block_by_hash(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let hash = path.into_inner().0;
    let bc = state.node.blockchain.read().expect("rwlock poisoned");
    match bc.get_block_by_hash(&hash) {
        Some(block) => HttpResponse::Ok().json(BlockResponse::from(block)),
        None => HttpResponse::NotFound().body("block not found"),
    }
}

/// Every stored block with this id, across branches.
#[get("/blocks/id/{id}/")]
pub async fn get_blocks_by_id(
    state: web::Data<AppState>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let id = path.into_inner().0;
    let bc = state.node.blockchain.read().expect("rwlock poisoned");
    let blocks: Vec<BlockResponse> = bc
        .get_block_by_id(id)
        .into_iter()
        .map(BlockResponse::from)
        .collect();
    HttpResponse::Ok().json(blocks)
}

/// Canonical blocks after `start_id`, ascending.
#[get("/blocks/range/{start_id}/")]
pub async fn get_block_range(
    state: web::Data<AppState>,
    path: web::Path<(u64,)>,
) -> impl Responder {
    let start_id = path.into_inner().0;
    let bc = state.node.blockchain.read().expect("rwlock poisoned");
    let blocks: Vec<BlockResponse> = bc
        .get_block_range(start_id)
        .into_iter()
        .map(BlockResponse::from)
        .collect();
    HttpResponse::Ok().json(blocks)
}

/// Submit a block mined elsewhere.
#[post("/blocks/")]
pub async fn submit_block(state: web::Data<AppState>, body: web::Json<Block>) -> impl Responder {
    let block = body.into_inner();
    let hash = block.compute_hash();
    let accepted = state.node.receive_block(block);
    if accepted {
        info!("POST /blocks/ - accepted {hash}");
        HttpResponse::Ok().json(SubmitBlockResponse { accepted, hash })
    } else {
        warn!("POST /blocks/ - rejected {hash}");
        HttpResponse::BadRequest().json(SubmitBlockResponse { accepted, hash })
    }
}
