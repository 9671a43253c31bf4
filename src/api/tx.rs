use actix_web::{HttpResponse, Responder, get, post, web};
use log::{debug, warn};

use super::models::{AppState, NewTxResponse, PendingResponse, TransactionLookupResponse};
use crate::transaction::{PoolRejection, Transaction};

/// Most recent canonical transactions, newest block first.
#[get("/transactions/last/{n}/")]
pub async fn get_last_transactions(
    state: web::Data<AppState>,
    path: web::Path<(usize,)>,
) -> impl Responder {
    let n = path.into_inner().0;
    let bc = state.node.blockchain.read().expect("rwlock poisoned");
    let txs: Vec<&Transaction> = bc.get_n_last_transactions(n);
    HttpResponse::Ok().json(txs)
}

#[get("/transactions/pending/")]
pub async fn get_pending(state: web::Data<AppState>) -> impl Responder {
    let pending = state.node.txpool.pending();
    HttpResponse::Ok().json(PendingResponse {
        size: pending.len(),
        transactions: pending
            .iter()
            .filter_map(|t| t.transaction_hash().map(str::to_string))
            .collect(),
    })
}

/// A canonical transaction and the block containing it.
#[get("/transactions/{hash}/")]
pub async fn get_transaction(
    state: web::Data<AppState>,
    path: web::Path<(String,)>,
) -> impl Responder {
    let hash = path.into_inner().0;
    let bc = state.node.blockchain.read().expect("rwlock poisoned");
    match bc.get_transaction(&hash) {
        Some((tx, block_hash)) => HttpResponse::Ok().json(TransactionLookupResponse {
            transaction: tx.clone(),
            block_hash,
        }),
        None => HttpResponse::NotFound().body("transaction not found"),
    }
}

/// Submit a signed transaction to the pool.
#[post("/transactions/")]
pub async fn post_transaction(
    state: web::Data<AppState>,
    body: web::Json<Transaction>,
) -> impl Responder {
    let tx = body.into_inner();
    let Some(hash) = tx.transaction_hash().map(str::to_string) else {
        warn!("POST /transactions/ - rejected: unsigned");
        return HttpResponse::BadRequest().body("transaction must be signed");
    };
    match state.node.submit_transaction(tx) {
        Ok(()) => {
            debug!("POST /transactions/ - queued {hash}");
            HttpResponse::Ok().json(NewTxResponse {
                transaction_hash: hash,
            })
        }
        Err(PoolRejection::InvalidSignature) => {
            warn!("POST /transactions/ - rejected {hash}: invalid signature");
            HttpResponse::BadRequest().body("invalid signature or hash")
        }
        Err(PoolRejection::Duplicate) => {
            HttpResponse::Conflict().body("transaction already pending")
        }
        Err(PoolRejection::AlreadyConfirmed) => {
            HttpResponse::Conflict().body("transaction already confirmed")
        }
    }
}
