use actix_web::{HttpResponse, Responder, get, web};

use super::models::{AppState, StatsResponse};

#[get("/stats/")]
pub async fn get_stats(state: web::Data<AppState>) -> impl Responder {
    let node = &state.node;
    let (height, tip_hash, stored_blocks, next_difficulty) = {
        let bc = node.blockchain.read().expect("rwlock poisoned");
        let tip_hash = bc.tip_hash().to_string();
        let next = bc
            .compute_difficulty_window(&tip_hash)
            .ok()
            .map(|w| w.difficulty);
        (bc.tip().id, tip_hash, bc.len(), next)
    };

    HttpResponse::Ok().json(StatsResponse {
        height,
        tip_hash,
        stored_blocks,
        next_difficulty,
        max_difficulty: node.consensus.max_difficulty(),
        pending_transactions: node.txpool.len(),
        dashboard: node.dashboard.snapshot(),
    })
}
