mod chain;
mod health;
pub mod models;
mod stats;
mod tx;
mod wallet;

use actix_web::web::{self, ServiceConfig};

pub use models::AppState;

pub fn init_routes(cfg: &mut ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(health::health_check)
            .service(chain::get_block_by_hash)
            .service(chain::get_blocks_by_id)
            .service(chain::get_block_range)
            .service(chain::submit_block)
            .service(tx::get_last_transactions)
            .service(tx::get_pending)
            .service(tx::get_transaction)
            .service(tx::post_transaction)
            .service(stats::get_stats)
            .service(wallet::create_wallet),
    );
}
