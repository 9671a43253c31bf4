use actix_web::{App, HttpServer, web};
use dotenvy::dotenv;
use log::{error, info};
use std::sync::Arc;

use forkchain::api::{self, AppState};
use forkchain::{Node, NodeConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let _ = dotenv();
    env_logger::init();

    let config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("invalid configuration: {e}");
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };
    let (host, port) = (config.host.clone(), config.port);

    println!("⛓️ Starting node {} at http://{host}:{port}", config.chain.node_id);

    let node = Arc::new(Node::new(config));
    let miner = if node.config().mining_enabled {
        Some(node.spawn_miner()?)
    } else {
        info!("mining disabled");
        None
    };

    let state = web::Data::new(AppState::new(node.clone()));
    let served = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(api::init_routes)
    })
    .bind((host.as_str(), port))?
    .run()
    .await;

    node.shutdown(miner);
    served
}
