use actix_web::{HttpResponse, Responder, post};

use super::models::NewWalletResponse;
use crate::crypto::generate_keypair_hex;

#[post("/wallet/new/")]
pub async fn create_wallet() -> impl Responder {
    let (private_key, public_key) = generate_keypair_hex();
    HttpResponse::Ok().json(NewWalletResponse {
        private_key,
        public_key,
    })
}
